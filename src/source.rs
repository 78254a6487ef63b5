//! The decoded original image.

use image::{DynamicImage, GenericImageView};

use crate::decode::DecodeRequest;
use crate::error::CodecError;
use crate::format::ImageFormat;
use crate::metadata::ImageMetadata;

/// An immutable decoded raster, the container format it came from and the
/// metadata every re-encoding carries forward.
///
/// Decoded once per file. Candidate re-encodings are always produced from it
/// afresh; nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: DynamicImage,
    format: ImageFormat,
    metadata: ImageMetadata,
}

impl SourceImage {
    pub fn new(pixels: DynamicImage, format: ImageFormat) -> Self {
        Self {
            pixels,
            format,
            metadata: ImageMetadata::none(),
        }
    }

    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Decode with format auto-detection and no resource limits.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        DecodeRequest::new(data).decode()
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// ICC profile and EXIF read from the source file.
    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Whether the pixel layout carries an alpha channel (opaque or not).
    pub fn has_alpha_channel(&self) -> bool {
        self.pixels.color().has_alpha()
    }

    /// Whether samples are wider than 8 bits.
    pub fn is_high_bit_depth(&self) -> bool {
        let color = self.pixels.color();
        color.bits_per_pixel() / u16::from(color.channel_count()) > 8
    }
}
