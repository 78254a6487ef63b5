//! Perceptual difference between an image and a re-encoding of it.

use crate::error::CodecError;
use crate::source::SourceImage;

/// Scores how different two images look. Larger is more different; 0 means
/// identical under the metric.
pub trait Metric {
    fn difference(&self, reference: &SourceImage, candidate: &SourceImage)
    -> Result<f64, CodecError>;
}

impl<M: Metric + ?Sized> Metric for &M {
    fn difference(
        &self,
        reference: &SourceImage,
        candidate: &SourceImage,
    ) -> Result<f64, CodecError> {
        (**self).difference(reference, candidate)
    }
}

/// Normalized root-mean-square channel error, in `[0, 1]`.
///
/// Compares RGB, plus alpha when either image has an alpha channel, at 16
/// bits per channel so a change below the 8-bit step of a deep source still
/// counts. 8-bit images widen exactly and score as they would at 8 bits.
/// This is the "fuzz" distance: 0.02 is roughly a 2% average deviation per
/// channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzMetric;

impl Metric for FuzzMetric {
    fn difference(
        &self,
        reference: &SourceImage,
        candidate: &SourceImage,
    ) -> Result<f64, CodecError> {
        if reference.dimensions() != candidate.dimensions() {
            return Err(CodecError::DimensionMismatch {
                expected: reference.dimensions(),
                actual: candidate.dimensions(),
            });
        }

        let channels = if reference.has_alpha_channel() || candidate.has_alpha_channel() {
            4
        } else {
            3
        };

        let a = reference.pixels().to_rgba16();
        let b = candidate.pixels().to_rgba16();

        let sum: u128 = a
            .pixels()
            .zip(b.pixels())
            .map(|(pa, pb)| {
                (0..channels)
                    .map(|c| {
                        let d = i64::from(pa[c]) - i64::from(pb[c]);
                        u128::from((d * d) as u64)
                    })
                    .sum::<u128>()
            })
            .sum();

        let samples = u64::from(a.width()) * u64::from(a.height()) * channels as u64;
        if samples == 0 {
            return Ok(0.0);
        }

        let full_scale = f64::from(u16::MAX);
        let mean = sum as f64 / (samples as f64 * full_scale * full_scale);
        Ok(mean.sqrt())
    }
}
