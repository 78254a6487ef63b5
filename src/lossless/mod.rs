//! Post-encode lossless recompression.

mod jpegtran;

use std::path::{Path, PathBuf};

use crate::atomic::write_atomic;
use crate::format::ImageFormat;

/// What a lossless pass did to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LosslessOutcome {
    /// The file was rewritten smaller.
    Optimized { before: u64, after: u64 },
    /// The optimizer ran but found nothing smaller; the file is untouched.
    Unchanged,
    /// No lossless optimizer for this format.
    Unsupported(ImageFormat),
    /// The pass was turned off.
    Disabled,
    /// The optimizer failed; the file is untouched.
    Failed(String),
}

impl LosslessOutcome {
    /// Bytes saved, zero unless [`Optimized`](Self::Optimized).
    pub fn saved(&self) -> u64 {
        match self {
            LosslessOutcome::Optimized { before, after } => before.saturating_sub(*after),
            _ => 0,
        }
    }
}

/// Lossless pass error.
#[derive(Debug, thiserror::Error)]
pub enum LosslessError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {message}", path.display())]
    Optimize { path: PathBuf, message: String },
}

/// Rewrites an encoded file in place without changing any decoded pixel.
///
/// Implementations must never leave the file larger than it was.
pub trait LosslessOptimizer {
    fn optimize(&self, path: &Path, format: ImageFormat) -> Result<LosslessOutcome, LosslessError>;
}

impl<L: LosslessOptimizer + ?Sized> LosslessOptimizer for &L {
    fn optimize(&self, path: &Path, format: ImageFormat) -> Result<LosslessOutcome, LosslessError> {
        (**self).optimize(path, format)
    }
}

/// The default lossless pass: oxipng for PNG, a progressive
/// coefficient transcode through mozjpeg for JPEG.
#[derive(Debug, Clone, Copy)]
pub struct Recompressor {
    preset: u8,
}

impl Recompressor {
    pub const DEFAULT_PRESET: u8 = 6;

    /// Oxipng preset 0 (fastest) to 6 (smallest). Higher values clamp to 6.
    /// JPEG recompression has no effort setting.
    pub fn new(preset: u8) -> Self {
        Self {
            preset: preset.min(Self::DEFAULT_PRESET),
        }
    }

    pub fn preset(&self) -> u8 {
        self.preset
    }

    fn oxipng_options(&self) -> oxipng::Options {
        let mut opts = oxipng::Options::from_preset(self.preset);
        opts.strip = oxipng::StripChunks::Safe;
        // Pixels under transparent areas stay as they are.
        opts.optimize_alpha = false;
        opts
    }

    fn recompress(&self, data: &[u8], format: ImageFormat) -> Option<Result<Vec<u8>, String>> {
        match format {
            ImageFormat::Png => Some(
                oxipng::optimize_from_memory(data, &self.oxipng_options()).map_err(|e| e.to_string()),
            ),
            ImageFormat::Jpeg => Some(jpegtran::transcode(data)),
            _ => None,
        }
    }
}

impl Default for Recompressor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PRESET)
    }
}

impl LosslessOptimizer for Recompressor {
    fn optimize(&self, path: &Path, format: ImageFormat) -> Result<LosslessOutcome, LosslessError> {
        let io_err = |source| LosslessError::Io {
            path: path.to_path_buf(),
            source,
        };

        let data = std::fs::read(path).map_err(io_err)?;
        let Some(result) = self.recompress(&data, format) else {
            return Ok(LosslessOutcome::Unsupported(format));
        };
        let optimized = result.map_err(|message| LosslessError::Optimize {
            path: path.to_path_buf(),
            message,
        })?;

        if optimized.len() >= data.len() {
            tracing::debug!(path = %path.display(), ?format, size = data.len(), "no lossless savings");
            return Ok(LosslessOutcome::Unchanged);
        }

        write_atomic(path, &optimized).map_err(io_err)?;
        tracing::debug!(
            path = %path.display(),
            ?format,
            before = data.len(),
            after = optimized.len(),
            preset = self.preset,
            "recompressed losslessly"
        );
        Ok(LosslessOutcome::Optimized {
            before: data.len() as u64,
            after: optimized.len() as u64,
        })
    }
}
