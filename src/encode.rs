//! Image encoding.

use crate::config::EncodeSettings;
use crate::pipeline::{self, PixelLayout};
use crate::source::SourceImage;
use crate::{CodecError, ImageFormat, Quality};

/// Image encode request builder.
///
/// Runs the pre-encode pipeline (fit, color type) and dispatches to the
/// format's encoder with the source's ICC profile and EXIF. Output format
/// defaults to the source's format.
///
/// # Example
///
/// ```no_run
/// use tinyimg::{EncodeRequest, Quality, SourceImage};
///
/// let data: &[u8] = &[]; // your image bytes
/// let image = SourceImage::decode(data)?;
/// let bytes = EncodeRequest::new()
///     .with_quality(Quality::new(80).unwrap())
///     .encode(&image)?;
/// # Ok::<(), tinyimg::CodecError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeRequest<'a> {
    format: Option<ImageFormat>,
    quality: Option<Quality>,
    settings: Option<&'a EncodeSettings>,
}

impl<'a> EncodeRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode to a specific format instead of the source's.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set quality. Defaults to [`Quality::MAX`].
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Set the non-quality encode parameters.
    pub fn with_settings(mut self, settings: &'a EncodeSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Encode the image.
    pub fn encode(self, image: &SourceImage) -> Result<Vec<u8>, CodecError> {
        let default_settings = EncodeSettings::default();
        let settings = self.settings.unwrap_or(&default_settings);
        let format = self.format.unwrap_or(image.format());
        let quality = self.quality.unwrap_or(Quality::MAX);

        if !format.can_reencode() {
            return Err(CodecError::UnsupportedFormat(format));
        }

        let fitted = pipeline::fit(image, settings);
        let mut layout = PixelLayout::choose(fitted.pixels(), format, settings.color);
        let source_metadata = (!settings.strip_metadata).then(|| fitted.metadata());
        if source_metadata.is_some_and(|m| m.has_rgb_profile()) {
            layout = layout.with_color();
        }
        let metadata = source_metadata
            .map(|m| m.embed_for(layout.is_grayscale()))
            .unwrap_or_default();
        let pixels = layout.convert(fitted.pixels());

        match format {
            ImageFormat::Jpeg => crate::codecs::jpeg::encode(&pixels, layout, quality, metadata),
            ImageFormat::Png => crate::codecs::png::encode(&pixels, layout, quality, metadata),
            other => Err(CodecError::UnsupportedFormat(other)),
        }
    }
}
