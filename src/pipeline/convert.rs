//! Pixel content checks for color-type optimization.

use image::DynamicImage;

/// Whether any pixel is not fully opaque.
///
/// Returns `false` for layouts without an alpha channel.
pub(crate) fn needs_alpha(pixels: &DynamicImage) -> bool {
    if !pixels.color().has_alpha() {
        return false;
    }
    match pixels {
        DynamicImage::ImageLumaA8(img) => img.pixels().any(|p| p[1] != u8::MAX),
        DynamicImage::ImageRgba8(img) => img.pixels().any(|p| p[3] != u8::MAX),
        DynamicImage::ImageRgba16(img) => img.pixels().any(|p| p[3] != u16::MAX),
        other => other.to_rgba16().pixels().any(|p| p[3] != u16::MAX),
    }
}

/// Whether every pixel is neutral (r = g = b).
pub(crate) fn is_grayscale(pixels: &DynamicImage) -> bool {
    if !pixels.color().has_color() {
        return true;
    }
    match pixels {
        DynamicImage::ImageRgb8(img) => img.pixels().all(|p| p[0] == p[1] && p[1] == p[2]),
        DynamicImage::ImageRgba8(img) => img.pixels().all(|p| p[0] == p[1] && p[1] == p[2]),
        DynamicImage::ImageRgb16(img) => img.pixels().all(|p| p[0] == p[1] && p[1] == p[2]),
        other => other
            .to_rgb16()
            .pixels()
            .all(|p| p[0] == p[1] && p[1] == p[2]),
    }
}
