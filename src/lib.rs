//! # tinyimg
//!
//! Re-encode an image at the lowest quality whose perceptual difference from
//! the original stays within a tolerance, then shrink the result further with
//! a lossless pass. The ICC profile and EXIF travel with the pixels.
//!
//! The search is a bounded binary search over the integer quality range,
//! driven by a [`Metric`] comparing the original against candidate
//! re-encodings produced by a [`Codec`]. Both are traits, so the search can be
//! exercised with synthetic codecs and metrics.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tinyimg::{ImageProcessor, ProcessOptions, Tolerance};
//!
//! let processor = ImageProcessor::new(ProcessOptions::default());
//! let report = processor.process(
//!     Path::new("photo.jpg"),
//!     Path::new("photo_tiny.jpg"),
//!     Tolerance::default(),
//! )?;
//! println!("quality {} -> {} bytes", report.quality, report.output_size);
//! # Ok::<(), tinyimg::ProcessError>(())
//! ```

#![deny(unsafe_code)]

mod atomic;
mod codec;
mod codecs;
mod config;
mod decode;
mod encode;
mod error;
mod format;
mod limits;
mod lossless;
mod metadata;
mod metric;
mod pipeline;
mod process;
mod quality;
mod search;
mod source;

pub use codec::{Codec, ImageCodec};
pub use config::{ColorMode, EncodeSettings, ResampleFilter, SearchConfig};
pub use decode::DecodeRequest;
pub use encode::EncodeRequest;
pub use error::{CodecError, ConfigError, ProcessError, Stage};
pub use format::ImageFormat;
pub use limits::Limits;
pub use lossless::{LosslessError, LosslessOptimizer, LosslessOutcome, Recompressor};
pub use metadata::ImageMetadata;
pub use metric::{FuzzMetric, Metric};
pub use process::{ImageProcessor, ProcessOptions, ProcessReport};
pub use quality::{Quality, QualityBounds, Tolerance};
pub use search::{Probe, QualitySearcher, SearchObserver, SearchOutcome};
pub use source::SourceImage;
