//! Single-file pipeline: read, decode, search, encode, write, recompress.

use std::path::Path;

use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::codec::{Codec, ImageCodec};
use crate::config::{EncodeSettings, SearchConfig};
use crate::error::ProcessError;
use crate::format::ImageFormat;
use crate::limits::Limits;
use crate::lossless::{LosslessOptimizer, LosslessOutcome, Recompressor};
use crate::metric::{FuzzMetric, Metric};
use crate::quality::{Quality, Tolerance};
use crate::search::QualitySearcher;

/// Per-run configuration for [`ImageProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub search: SearchConfig,
    pub settings: EncodeSettings,
    pub limits: Limits,
    /// Run the lossless pass on the written file.
    pub lossless: bool,
    /// Leave the destination alone when the re-encoding is not smaller than
    /// the input.
    pub skip_if_larger: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            settings: EncodeSettings::default(),
            limits: Limits::default(),
            lossless: true,
            skip_if_larger: false,
        }
    }
}

impl ProcessOptions {
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_settings(mut self, settings: EncodeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_lossless(mut self, enabled: bool) -> Self {
        self.lossless = enabled;
        self
    }

    pub fn with_skip_if_larger(mut self, skip: bool) -> Self {
        self.skip_if_larger = skip;
        self
    }
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub format: ImageFormat,
    pub input_size: u64,
    pub quality: Quality,
    pub iterations: u32,
    /// Size of the final lossy encode, before the lossless pass.
    pub encoded_size: u64,
    /// Size of the output file. Equal to `input_size` when skipped.
    pub output_size: u64,
    pub lossless: LosslessOutcome,
    /// The encode was not smaller, so the output holds the original bytes.
    pub skipped: bool,
    /// When skipped, whether the original was copied to a separate output
    /// path. `false` for in-place runs, where the input is left alone.
    pub copied: bool,
}

impl ProcessReport {
    /// Output size relative to input, as a percentage change. Negative is a
    /// reduction.
    pub fn change_pct(&self) -> f64 {
        if self.input_size == 0 {
            return 0.0;
        }
        (self.output_size as f64 - self.input_size as f64) / self.input_size as f64 * 100.0
    }
}

/// Runs the full pipeline for one file at a time.
///
/// Holds no per-file state, so one processor can be shared across threads
/// when its collaborators are `Sync`.
#[derive(Debug)]
pub struct ImageProcessor<C = ImageCodec, M = FuzzMetric, L = Recompressor> {
    options: ProcessOptions,
    codec: C,
    metric: M,
    lossless: L,
}

impl ImageProcessor {
    /// Processor with the default codec, metric and lossless optimizer. The
    /// codec enforces `options.limits`.
    pub fn new(options: ProcessOptions) -> Self {
        let codec = ImageCodec::new(options.limits.clone());
        Self {
            options,
            codec,
            metric: FuzzMetric,
            lossless: Recompressor::default(),
        }
    }
}

impl<C, M, L> ImageProcessor<C, M, L> {
    pub fn with_codec<C2: Codec>(self, codec: C2) -> ImageProcessor<C2, M, L> {
        ImageProcessor {
            options: self.options,
            codec,
            metric: self.metric,
            lossless: self.lossless,
        }
    }

    pub fn with_metric<M2: Metric>(self, metric: M2) -> ImageProcessor<C, M2, L> {
        ImageProcessor {
            options: self.options,
            codec: self.codec,
            metric,
            lossless: self.lossless,
        }
    }

    pub fn with_lossless<L2: LosslessOptimizer>(self, lossless: L2) -> ImageProcessor<C, M, L2> {
        ImageProcessor {
            options: self.options,
            codec: self.codec,
            metric: self.metric,
            lossless,
        }
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }
}

impl<C: Codec, M: Metric, L: LosslessOptimizer> ImageProcessor<C, M, L> {
    /// Re-encode `input` at the lowest quality within `eps` and write it to
    /// `output`. `output` may be `input`.
    pub fn process(
        &self,
        input: &Path,
        output: &Path,
        eps: Tolerance,
    ) -> Result<ProcessReport, ProcessError> {
        let data = std::fs::read(input).map_err(|source| ProcessError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        let input_size = data.len() as u64;

        let original = self
            .codec
            .decode(&data)
            .map_err(|source| ProcessError::Decode {
                path: input.to_path_buf(),
                source,
            })?;
        let format = original.format();
        debug!(
            path = %input.display(),
            ?format,
            width = original.width(),
            height = original.height(),
            "decoded"
        );

        let outcome = QualitySearcher::new(&self.codec, &self.metric)
            .with_config(self.options.search)
            .with_settings(self.options.settings)
            .find_quality(&original, eps)
            .map_err(|source| ProcessError::Search {
                path: input.to_path_buf(),
                source,
            })?;
        debug!(
            path = %input.display(),
            quality = outcome.quality.get(),
            iterations = outcome.iterations,
            %eps,
            "search converged"
        );

        let encoded = self
            .codec
            .encode(&original, outcome.quality, &self.options.settings)
            .map_err(|source| ProcessError::Encode {
                path: input.to_path_buf(),
                quality: outcome.quality.get(),
                source,
            })?;
        let encoded_size = encoded.len() as u64;

        let write_err = |source| ProcessError::Write {
            path: output.to_path_buf(),
            source,
        };

        if self.options.skip_if_larger && encoded_size >= input_size {
            // A separate destination still gets a file: the original is
            // the smaller of the two.
            let copied = !same_file(input, output);
            if copied {
                create_parent(output).map_err(write_err)?;
                write_atomic(output, &data).map_err(write_err)?;
            }
            debug!(
                path = %input.display(),
                input_size,
                encoded_size,
                copied,
                "encode not smaller, keeping original"
            );
            return Ok(ProcessReport {
                format,
                input_size,
                quality: outcome.quality,
                iterations: outcome.iterations,
                encoded_size,
                output_size: input_size,
                lossless: LosslessOutcome::Disabled,
                skipped: true,
                copied,
            });
        }
        drop(data);

        create_parent(output).map_err(write_err)?;
        write_atomic(output, &encoded).map_err(write_err)?;
        debug!(path = %output.display(), size = encoded_size, "wrote");

        let lossless = if self.options.lossless {
            match self.lossless.optimize(output, format) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(path = %output.display(), error = %e, "lossless pass failed");
                    LosslessOutcome::Failed(e.to_string())
                }
            }
        } else {
            LosslessOutcome::Disabled
        };
        let output_size = match lossless {
            LosslessOutcome::Optimized { after, .. } => after,
            _ => encoded_size,
        };

        Ok(ProcessReport {
            format,
            input_size,
            quality: outcome.quality,
            iterations: outcome.iterations,
            encoded_size,
            output_size,
            lossless,
            skipped: false,
            copied: false,
        })
    }
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent),
        None => Ok(()),
    }
}

/// Whether two paths name the same file. A missing path is never the same.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
