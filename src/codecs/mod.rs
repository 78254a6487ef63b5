//! Codec adapters for format-specific implementations.
//!
//! Decoding goes through the `image` crate for every format; each encoder
//! module is a thin adapter over its format-specific crate.

use std::io::Cursor;

use image::{DynamicImage, ImageDecoder, ImageError, ImageReader};

use crate::metadata::ImageMetadata;
use crate::{CodecError, ImageFormat, Limits};

pub(crate) mod jpeg;
pub(crate) mod png;

/// Decode `data` as `format`, enforcing `limits` inside the decoder.
///
/// Unreadable metadata is dropped rather than failing the decode.
pub(crate) fn decode(
    data: &[u8],
    format: ImageFormat,
    limits: Option<&Limits>,
) -> Result<(DynamicImage, ImageMetadata), CodecError> {
    let mut reader = ImageReader::with_format(Cursor::new(data), format.to_image_crate());
    if let Some(limits) = limits {
        reader.limits(limits.to_decoder_limits());
    }
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| map_image_error(format, e))?;

    let mut metadata = ImageMetadata::none();
    match decoder.icc_profile() {
        Ok(Some(icc)) => metadata = metadata.with_icc_profile(icc),
        Ok(None) => {}
        Err(e) => tracing::debug!(?format, error = %e, "unreadable ICC profile"),
    }
    match decoder.exif_metadata() {
        Ok(Some(exif)) => metadata = metadata.with_exif(exif),
        Ok(None) => {}
        Err(e) => tracing::debug!(?format, error = %e, "unreadable EXIF"),
    }

    let pixels = DynamicImage::from_decoder(decoder).map_err(|e| map_image_error(format, e))?;
    Ok((pixels, metadata))
}

pub(crate) fn map_image_error(format: ImageFormat, error: ImageError) -> CodecError {
    match error {
        ImageError::Limits(e) => CodecError::LimitExceeded(e.to_string()),
        other => CodecError::from_codec(format, other),
    }
}
