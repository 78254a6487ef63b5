//! JPEG encoder adapter using jpeg-encoder.

use image::{DynamicImage, GenericImageView};
use jpeg_encoder::{ColorType, Encoder};

use crate::metadata::{EXIF_PREFIX, EmbeddedMetadata};
use crate::pipeline::PixelLayout;
use crate::{CodecError, ImageFormat, Quality};

/// Encode pixels already converted to `layout` as a baseline JPEG.
///
/// Huffman tables are optimized per image, which shrinks the output without
/// touching the quantized coefficients. The ICC profile goes into APP2
/// segments and EXIF into APP1.
pub(crate) fn encode(
    pixels: &DynamicImage,
    layout: PixelLayout,
    quality: Quality,
    metadata: EmbeddedMetadata<'_>,
) -> Result<Vec<u8>, CodecError> {
    let (width, height) = pixels.dimensions();
    let width = u16::try_from(width)
        .map_err(|_| CodecError::InvalidInput(format!("JPEG width {width} exceeds 65535")))?;
    let height = u16::try_from(height)
        .map_err(|_| CodecError::InvalidInput(format!("JPEG height {height} exceeds 65535")))?;

    let color = match layout {
        PixelLayout::Gray8 => ColorType::Luma,
        PixelLayout::Rgb8 => ColorType::Rgb,
        PixelLayout::GrayAlpha8 | PixelLayout::Rgba8 => {
            return Err(CodecError::InvalidInput(
                "JPEG cannot store an alpha channel".into(),
            ));
        }
        PixelLayout::Gray16 | PixelLayout::GrayAlpha16 | PixelLayout::Rgb16 | PixelLayout::Rgba16 => {
            return Err(CodecError::InvalidInput(
                "JPEG stores 8 bits per sample".into(),
            ));
        }
    };
    let codec_err = |e| CodecError::from_codec(ImageFormat::Jpeg, e);

    let mut output = Vec::new();
    let mut encoder = Encoder::new(&mut output, quality.get());
    encoder.set_optimized_huffman_tables(true);
    if let Some(icc) = metadata.icc_profile {
        encoder.add_icc_profile(icc).map_err(codec_err)?;
    }
    if let Some(exif) = metadata.exif {
        let segment = [EXIF_PREFIX, exif].concat();
        // A segment over 64 KiB cannot be written; the image still can.
        if let Err(e) = encoder.add_app_segment(1, &segment) {
            tracing::debug!(size = segment.len(), error = %e, "EXIF does not fit an APP1 segment");
        }
    }
    encoder
        .encode(pixels.as_bytes(), width, height, color)
        .map_err(codec_err)?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x + y) * 255 / (width + height)) as u8,
            ])
        }))
    }

    #[test]
    fn encodes_valid_jpeg_markers() {
        let data = encode(&gradient(48, 32), PixelLayout::Rgb8, Quality::new(75).unwrap(), EmbeddedMetadata::default()).unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8], "missing SOI marker");
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xD9], "missing EOI marker");
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = gradient(96, 96);
        let low = encode(&img, PixelLayout::Rgb8, Quality::new(20).unwrap(), EmbeddedMetadata::default()).unwrap();
        let high = encode(&img, PixelLayout::Rgb8, Quality::new(95).unwrap(), EmbeddedMetadata::default()).unwrap();
        assert!(low.len() < high.len(), "{} >= {}", low.len(), high.len());
    }

    #[test]
    fn deterministic_output() {
        let img = gradient(40, 40);
        let q = Quality::new(60).unwrap();
        let a = encode(&img, PixelLayout::Rgb8, q, EmbeddedMetadata::default()).unwrap();
        let b = encode(&img, PixelLayout::Rgb8, q, EmbeddedMetadata::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn alpha_layout_rejected() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        let result = encode(&img, PixelLayout::Rgba8, Quality::MAX, EmbeddedMetadata::default());
        assert!(matches!(result, Err(CodecError::InvalidInput(_))));
    }
}
