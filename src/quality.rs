//! Quality levels, search bounds, and the difference tolerance.

use core::fmt;

use crate::error::ConfigError;

/// Lossy encoding quality, 1 (smallest, least faithful) to 100 (largest, most
/// faithful).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: Quality = Quality(1);
    pub const MAX: Quality = Quality(100);

    /// Create a quality level, rejecting values outside 1..=100.
    pub fn new(value: u32) -> Result<Self, ConfigError> {
        if (1..=100).contains(&value) {
            Ok(Quality(value as u8))
        } else {
            Err(ConfigError::InvalidQuality(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// `floor((self + other) / 2)`, always within 1..=100.
    pub(crate) fn midpoint(self, other: Quality) -> Quality {
        Quality(((u16::from(self.0) + u16::from(other.0)) / 2) as u8)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Initial `(min, max)` bounds of the quality search.
///
/// `max` is assumed acceptable without being probed, and `min` is assumed
/// unacceptable. The gap must be at least 2 so the search probes at least one
/// quality; a narrower range would leave nothing to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityBounds {
    min: Quality,
    max: Quality,
}

impl QualityBounds {
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        let (lo, hi) = match (Quality::new(min), Quality::new(max)) {
            (Ok(lo), Ok(hi)) if lo < hi => (lo, hi),
            _ => return Err(ConfigError::InvalidBounds { min, max }),
        };
        if hi.get() - lo.get() < 2 {
            return Err(ConfigError::EmptySearchRange { min, max });
        }
        Ok(Self { min: lo, max: hi })
    }

    pub fn min(&self) -> Quality {
        self.min
    }

    pub fn max(&self) -> Quality {
        self.max
    }

    /// Worst-case number of probes: `ceil(log2(max - min))`.
    pub fn max_iterations(&self) -> u32 {
        let gap = u32::from(self.max.get() - self.min.get());
        u32::BITS - (gap - 1).leading_zeros()
    }
}

impl Default for QualityBounds {
    fn default() -> Self {
        Self {
            min: Quality::MIN,
            max: Quality::MAX,
        }
    }
}

/// Largest acceptable perceptual difference between original and output.
///
/// A candidate is acceptable when its difference score is `<= eps`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(f64);

impl Tolerance {
    pub const DEFAULT: Tolerance = Tolerance(0.02);

    pub fn new(eps: f64) -> Result<Self, ConfigError> {
        if eps.is_finite() && eps >= 0.0 {
            Ok(Tolerance(eps))
        } else {
            Err(ConfigError::InvalidTolerance(eps))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Whether a difference score is within tolerance.
    pub fn accepts(self, diff: f64) -> bool {
        diff <= self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl core::str::FromStr for Tolerance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let eps: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("not a number: {s:?}"))?;
        Tolerance::new(eps).map_err(|e| e.to_string())
    }
}
