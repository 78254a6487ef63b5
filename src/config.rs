//! Encode and search configuration.
//!
//! [`EncodeSettings`] holds every non-quality encode parameter. The same value
//! is used for the candidate encodes during the search and for the final
//! encode, so the difference measured during the search is the difference the
//! output will have.

use crate::quality::QualityBounds;

/// Resampling filter used when an image must be scaled to fit
/// [`EncodeSettings::max_dimensions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleFilter {
    /// Lanczos with a 3-lobe window. Sharpest of the set.
    #[default]
    Lanczos,
    CatmullRom,
    Gaussian,
    Triangle,
    Nearest,
}

impl ResampleFilter {
    pub(crate) fn to_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResampleFilter::Lanczos => FilterType::Lanczos3,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::Nearest => FilterType::Nearest,
        }
    }
}

/// How the output color type is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Smallest color type that keeps the visible content: grayscale when
    /// every pixel is neutral, no alpha when every pixel is opaque.
    #[default]
    Optimize,
    /// Keep the decoded channel layout. JPEG still gets 8 bits per channel.
    Preserve,
}

/// Non-quality parameters shared by search-time and final encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSettings {
    pub filter: ResampleFilter,
    pub color: ColorMode,
    /// Scale images larger than this box down to fit, preserving aspect ratio.
    pub max_dimensions: Option<(u32, u32)>,
    /// Leave the source's ICC profile and EXIF out of the output.
    pub strip_metadata: bool,
}

impl EncodeSettings {
    pub fn with_filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    /// Fit output within `width` × `height`. Zero in either dimension leaves
    /// that dimension unconstrained.
    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some((width, height));
        self
    }

    pub fn with_strip_metadata(mut self, strip: bool) -> Self {
        self.strip_metadata = strip;
        self
    }
}

/// Explicit configuration for [`QualitySearcher`](crate::QualitySearcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchConfig {
    pub bounds: QualityBounds,
}

impl SearchConfig {
    pub fn with_bounds(mut self, bounds: QualityBounds) -> Self {
        self.bounds = bounds;
        self
    }
}
