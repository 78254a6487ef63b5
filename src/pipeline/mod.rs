//! Pre-encode pipeline: fit to size → choose color type → convert.
//!
//! Everything here is a pure function of the source image and the
//! [`EncodeSettings`], so search-time candidates and the final output see
//! exactly the same pixels apart from the quality-dependent encode.

mod convert;

use std::borrow::Cow;

use image::DynamicImage;

use crate::config::{ColorMode, EncodeSettings};
use crate::format::ImageFormat;
use crate::source::SourceImage;

/// Channel layout handed to an encoder.
///
/// 16-bit layouts are only chosen for formats that store them, and only for
/// sources that have more than 8 bits per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PixelLayout {
    Gray8,
    GrayAlpha8,
    Rgb8,
    Rgba8,
    Gray16,
    GrayAlpha16,
    Rgb16,
    Rgba16,
}

impl PixelLayout {
    /// Pick the layout for `pixels` in `format` under `mode`.
    pub(crate) fn choose(pixels: &DynamicImage, format: ImageFormat, mode: ColorMode) -> Self {
        let color = pixels.color();
        let (gray, alpha) = match mode {
            ColorMode::Optimize => (convert::is_grayscale(pixels), convert::needs_alpha(pixels)),
            ColorMode::Preserve => (!color.has_color(), color.has_alpha()),
        };
        let alpha = alpha && format.supports_alpha();
        let deep = format.max_bits_per_sample() > 8
            && color.bits_per_pixel() / u16::from(color.channel_count()) > 8;

        match (gray, alpha, deep) {
            (true, false, false) => PixelLayout::Gray8,
            (true, true, false) => PixelLayout::GrayAlpha8,
            (false, false, false) => PixelLayout::Rgb8,
            (false, true, false) => PixelLayout::Rgba8,
            (true, false, true) => PixelLayout::Gray16,
            (true, true, true) => PixelLayout::GrayAlpha16,
            (false, false, true) => PixelLayout::Rgb16,
            (false, true, true) => PixelLayout::Rgba16,
        }
    }

    pub(crate) fn is_grayscale(self) -> bool {
        matches!(
            self,
            PixelLayout::Gray8
                | PixelLayout::GrayAlpha8
                | PixelLayout::Gray16
                | PixelLayout::GrayAlpha16
        )
    }

    /// The color counterpart of a grayscale layout.
    pub(crate) fn with_color(self) -> Self {
        match self {
            PixelLayout::Gray8 => PixelLayout::Rgb8,
            PixelLayout::GrayAlpha8 => PixelLayout::Rgba8,
            PixelLayout::Gray16 => PixelLayout::Rgb16,
            PixelLayout::GrayAlpha16 => PixelLayout::Rgba16,
            other => other,
        }
    }

    /// Convert to this layout, borrowing when already in it.
    pub(crate) fn convert(self, pixels: &DynamicImage) -> Cow<'_, DynamicImage> {
        use DynamicImage as D;
        match (self, pixels) {
            (PixelLayout::Gray8, D::ImageLuma8(_))
            | (PixelLayout::GrayAlpha8, D::ImageLumaA8(_))
            | (PixelLayout::Rgb8, D::ImageRgb8(_))
            | (PixelLayout::Rgba8, D::ImageRgba8(_))
            | (PixelLayout::Gray16, D::ImageLuma16(_))
            | (PixelLayout::GrayAlpha16, D::ImageLumaA16(_))
            | (PixelLayout::Rgb16, D::ImageRgb16(_))
            | (PixelLayout::Rgba16, D::ImageRgba16(_)) => Cow::Borrowed(pixels),
            (PixelLayout::Gray8, _) => Cow::Owned(D::ImageLuma8(pixels.to_luma8())),
            (PixelLayout::GrayAlpha8, _) => Cow::Owned(D::ImageLumaA8(pixels.to_luma_alpha8())),
            (PixelLayout::Rgb8, _) => Cow::Owned(D::ImageRgb8(pixels.to_rgb8())),
            (PixelLayout::Rgba8, _) => Cow::Owned(D::ImageRgba8(pixels.to_rgba8())),
            (PixelLayout::Gray16, _) => Cow::Owned(D::ImageLuma16(pixels.to_luma16())),
            (PixelLayout::GrayAlpha16, _) => {
                Cow::Owned(D::ImageLumaA16(pixels.to_luma_alpha16()))
            }
            (PixelLayout::Rgb16, _) => Cow::Owned(D::ImageRgb16(pixels.to_rgb16())),
            (PixelLayout::Rgba16, _) => Cow::Owned(D::ImageRgba16(pixels.to_rgba16())),
        }
    }
}

/// Scale `image` down to fit `settings.max_dimensions`, if it does not
/// already. Idempotent: a fitted image is returned borrowed.
pub(crate) fn fit<'a>(image: &'a SourceImage, settings: &EncodeSettings) -> Cow<'a, SourceImage> {
    let Some((max_w, max_h)) = settings.max_dimensions else {
        return Cow::Borrowed(image);
    };
    let (w, h) = image.dimensions();
    let max_w = if max_w == 0 { w } else { max_w };
    let max_h = if max_h == 0 { h } else { max_h };
    if w <= max_w && h <= max_h {
        return Cow::Borrowed(image);
    }

    let resized = image
        .pixels()
        .resize(max_w, max_h, settings.filter.to_filter_type());
    tracing::debug!(
        from = ?(w, h),
        to = ?(resized.width(), resized.height()),
        filter = ?settings.filter,
        "scaled source to fit"
    );
    Cow::Owned(SourceImage::new(resized, image.format()).with_metadata(image.metadata().clone()))
}
