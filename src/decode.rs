//! Image decoding.

use crate::source::SourceImage;
use crate::{CodecError, ImageFormat, Limits};

/// Image decode request builder.
///
/// # Example
///
/// ```no_run
/// use tinyimg::DecodeRequest;
///
/// let data: &[u8] = &[]; // your image bytes
/// let image = DecodeRequest::new(data).decode()?;
/// println!("{}x{}", image.width(), image.height());
/// # Ok::<(), tinyimg::CodecError>(())
/// ```
pub struct DecodeRequest<'a> {
    data: &'a [u8],
    format: Option<ImageFormat>,
    limits: Option<&'a Limits>,
}

impl<'a> DecodeRequest<'a> {
    /// Create a new decode request.
    ///
    /// Format will be auto-detected from magic bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            format: None,
            limits: None,
        }
    }

    /// Override format auto-detection.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set resource limits.
    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Decode the image to pixels.
    ///
    /// Formats that cannot be re-encoded are rejected before any pixel data
    /// is decoded.
    pub fn decode(self) -> Result<SourceImage, CodecError> {
        let format = match self.format {
            Some(f) => f,
            None => ImageFormat::detect(self.data).ok_or(CodecError::UnrecognizedFormat)?,
        };

        if !format.can_reencode() {
            return Err(CodecError::UnsupportedFormat(format));
        }

        let (pixels, metadata) = crate::codecs::decode(self.data, format, self.limits)?;

        if let Some(limits) = self.limits {
            limits
                .check_dimensions(pixels.width(), pixels.height())
                .map_err(|msg| CodecError::LimitExceeded(msg.into()))?;
        }

        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(CodecError::InvalidInput("image has no pixels".into()));
        }

        Ok(SourceImage::new(pixels, format).with_metadata(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_pattern() {
        let data = b"test";
        let request = DecodeRequest::new(data).with_format(ImageFormat::Jpeg);
        assert_eq!(request.format, Some(ImageFormat::Jpeg));
    }

    #[test]
    fn unrecognized_format_error() {
        let result = DecodeRequest::new(b"definitely not an image").decode();
        assert!(matches!(result, Err(CodecError::UnrecognizedFormat)));
    }

    #[test]
    fn unsupported_format_rejected_before_decode() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";
        let result = DecodeRequest::new(gif).decode();
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedFormat(ImageFormat::Gif))
        ));
    }

    #[test]
    fn truncated_jpeg_is_codec_error() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        let result = DecodeRequest::new(&jpeg).decode();
        assert!(matches!(
            result,
            Err(CodecError::Codec {
                format: ImageFormat::Jpeg,
                ..
            })
        ));
    }

    #[test]
    fn limits_reject_large_image() {
        let img = image::RgbImage::from_pixel(64, 32, image::Rgb([10, 20, 30]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let limits = Limits {
            max_pixels: Some(1000),
            ..Default::default()
        };
        let result = DecodeRequest::new(&png).with_limits(&limits).decode();
        assert!(matches!(result, Err(CodecError::LimitExceeded(_))));

        let decoded = DecodeRequest::new(&png).decode().unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
        assert_eq!(decoded.format(), ImageFormat::Png);
    }
}
