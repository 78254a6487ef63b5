//! Error types for codec operations, configuration, and per-file processing.

use std::fmt;
use std::path::PathBuf;

use crate::format::ImageFormat;

/// Unified error type for codec and metric operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// Format not recognized from magic bytes.
    #[error("unrecognized image format")]
    UnrecognizedFormat,
    /// Format recognized but no encoder is available for it.
    #[error("format {0:?} is not supported for re-encoding")]
    UnsupportedFormat(ImageFormat),
    /// Input validation failed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Resource limit exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    /// Two images being compared have different dimensions.
    #[error("dimension mismatch: {expected:?} vs {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// Underlying codec error.
    #[error("codec error ({format:?}): {source}")]
    Codec {
        format: ImageFormat,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CodecError {
    /// Wrap a codec-specific error.
    pub fn from_codec<E>(format: ImageFormat, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CodecError::Codec {
            format,
            source: Box::new(error),
        }
    }
}

/// Invalid search or encode configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Tolerance must be finite and non-negative.
    #[error("tolerance must be a finite, non-negative number (got {0})")]
    InvalidTolerance(f64),
    /// Quality outside 1..=100.
    #[error("quality must be in 1..=100 (got {0})")]
    InvalidQuality(u32),
    /// Bounds out of range or inverted.
    #[error("invalid quality bounds {min}..{max}")]
    InvalidBounds { min: u32, max: u32 },
    /// Bounds so close that the search would never probe a quality.
    #[error("quality bounds {min}..{max} leave nothing to search (need max - min >= 2)")]
    EmptySearchRange { min: u32, max: u32 },
}

/// Pipeline stage a [`ProcessError`] occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Decode,
    Search,
    Encode,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Read => "read",
            Stage::Decode => "decode",
            Stage::Search => "search",
            Stage::Encode => "encode",
            Stage::Write => "write",
        })
    }
}

/// Failure processing a single file. Scoped to that file only.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("searching quality for {}: {source}", path.display())]
    Search {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("encoding {} at quality {quality}: {source}", path.display())]
    Encode {
        path: PathBuf,
        quality: u8,
        #[source]
        source: CodecError,
    },
    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            ProcessError::Read { .. } => Stage::Read,
            ProcessError::Decode { .. } => Stage::Decode,
            ProcessError::Search { .. } => Stage::Search,
            ProcessError::Encode { .. } => Stage::Encode,
            ProcessError::Write { .. } => Stage::Write,
        }
    }

    /// The file the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ProcessError::Read { path, .. }
            | ProcessError::Decode { path, .. }
            | ProcessError::Search { path, .. }
            | ProcessError::Encode { path, .. }
            | ProcessError::Write { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_error_reports_stage_and_path() {
        let err = ProcessError::Decode {
            path: PathBuf::from("a/b.jpg"),
            source: CodecError::UnrecognizedFormat,
        };
        assert_eq!(err.stage(), Stage::Decode);
        assert_eq!(err.path(), std::path::Path::new("a/b.jpg"));
        assert_eq!(err.to_string(), "decoding a/b.jpg: unrecognized image format");
    }

    #[test]
    fn codec_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad huffman table");
        let err = CodecError::from_codec(ImageFormat::Jpeg, io);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("bad huffman table"));
    }
}
