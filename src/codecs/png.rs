//! PNG encoder adapter using the image crate's PNG encoder.
//!
//! PNG is lossless, so quality only selects compression effort and row filter,
//! read the way ImageMagick reads PNG quality: the tens digit is the zlib
//! effort, the ones digit the filter.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder};

use crate::metadata::EmbeddedMetadata;
use crate::pipeline::PixelLayout;
use crate::{CodecError, ImageFormat, Quality};

/// Compression effort and row filter for a quality value.
pub(crate) fn params_for_quality(quality: Quality) -> (CompressionType, FilterType) {
    let q = quality.get();
    let compression = match (q / 10).min(9) {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    };
    let filter = match q % 10 {
        0 => FilterType::NoFilter,
        1 => FilterType::Sub,
        2 => FilterType::Up,
        3 => FilterType::Avg,
        4 => FilterType::Paeth,
        _ => FilterType::Adaptive,
    };
    (compression, filter)
}

/// Encode pixels already converted to `layout` as PNG.
///
/// The ICC profile is written as `iCCP`, EXIF as an `eXIf` chunk right
/// after `IHDR`.
pub(crate) fn encode(
    pixels: &DynamicImage,
    layout: PixelLayout,
    quality: Quality,
    metadata: EmbeddedMetadata<'_>,
) -> Result<Vec<u8>, CodecError> {
    let (width, height) = pixels.dimensions();
    let (compression, filter) = params_for_quality(quality);

    let color = match layout {
        PixelLayout::Gray8 => ExtendedColorType::L8,
        PixelLayout::GrayAlpha8 => ExtendedColorType::La8,
        PixelLayout::Rgb8 => ExtendedColorType::Rgb8,
        PixelLayout::Rgba8 => ExtendedColorType::Rgba8,
        PixelLayout::Gray16 => ExtendedColorType::L16,
        PixelLayout::GrayAlpha16 => ExtendedColorType::La16,
        PixelLayout::Rgb16 => ExtendedColorType::Rgb16,
        PixelLayout::Rgba16 => ExtendedColorType::Rgba16,
    };

    let mut output = Vec::new();
    let mut encoder = PngEncoder::new_with_quality(&mut output, compression, filter);
    if let Some(icc) = metadata.icc_profile {
        encoder
            .set_icc_profile(icc.to_vec())
            .map_err(|e| CodecError::from_codec(ImageFormat::Png, e))?;
    }
    encoder
        .write_image(pixels.as_bytes(), width, height, color)
        .map_err(|e| CodecError::from_codec(ImageFormat::Png, e))?;

    if let Some(exif) = metadata.exif {
        insert_after_ihdr(&mut output, &chunk(b"eXIf", exif));
    }
    Ok(output)
}

/// Signature (8) plus the IHDR chunk (4 length, 4 type, 13 data, 4 CRC).
const IHDR_END: usize = 8 + 4 + 4 + 13 + 4;

fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + data.len());
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
    out
}

fn insert_after_ihdr(png: &mut Vec<u8>, chunk: &[u8]) {
    png.splice(IHDR_END..IHDR_END, chunk.iter().copied());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_digits_select_effort_and_filter() {
        let q = |v| Quality::new(v).unwrap();
        assert!(matches!(
            params_for_quality(q(75)),
            (CompressionType::Best, FilterType::Adaptive)
        ));
        assert!(matches!(
            params_for_quality(q(2)),
            (CompressionType::Fast, FilterType::Up)
        ));
        assert!(matches!(
            params_for_quality(q(44)),
            (CompressionType::Default, FilterType::Paeth)
        ));
        assert!(matches!(
            params_for_quality(Quality::MAX),
            (CompressionType::Best, FilterType::NoFilter)
        ));
    }

    #[test]
    fn roundtrip_is_lossless() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(17, 9, |x, y| {
            image::Rgba([x as u8 * 13, y as u8 * 27, 200, (x + y) as u8 * 9])
        }));
        let data = encode(
            &img,
            PixelLayout::Rgba8,
            Quality::new(1).unwrap(),
            EmbeddedMetadata::default(),
        )
        .unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.as_bytes(), img.as_bytes());
    }

    #[test]
    fn sixteen_bit_roundtrip_is_exact() {
        let img = DynamicImage::ImageLumaA16(image::ImageBuffer::from_fn(5, 4, |x, y| {
            image::LumaA([x as u16 * 13_001 + y as u16, 65_535 - y as u16 * 3])
        }));
        let data = encode(
            &img,
            PixelLayout::GrayAlpha16,
            Quality::new(50).unwrap(),
            EmbeddedMetadata::default(),
        )
        .unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.color(), image::ColorType::La16);
        assert_eq!(decoded.to_luma_alpha16().as_raw(), img.to_luma_alpha16().as_raw());
    }

    #[test]
    fn exif_chunk_follows_ihdr() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(3, 3));
        let exif = b"MM\0*\0\0\0\x08\0\0\0\0\0\0";
        let data = encode(
            &img,
            PixelLayout::Gray8,
            Quality::new(50).unwrap(),
            EmbeddedMetadata {
                icc_profile: None,
                exif: Some(exif),
            },
        )
        .unwrap();
        assert_eq!(&data[12..16], b"IHDR");
        assert_eq!(&data[IHDR_END + 4..IHDR_END + 8], b"eXIf");
        // Still a valid PNG with the same pixels.
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.as_bytes(), img.as_bytes());
    }
}
