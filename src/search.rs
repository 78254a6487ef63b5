//! Binary search for the lowest acceptable quality.
//!
//! The search narrows `(min, max)`, where `min` is a quality known (or
//! assumed) to be too lossy and `max` one known (or assumed) to be within
//! tolerance. Each iteration encodes the reference at the midpoint, decodes
//! the candidate, and scores it against the reference. The loop stops when the
//! bounds are adjacent and returns `max`.

use crate::codec::Codec;
use crate::config::{EncodeSettings, SearchConfig};
use crate::error::CodecError;
use crate::metric::Metric;
use crate::pipeline;
use crate::quality::{Quality, Tolerance};
use crate::source::SourceImage;

/// One measured candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    /// 1-based iteration number.
    pub iteration: u32,
    pub quality: Quality,
    pub diff: f64,
    /// `diff <= eps`
    pub accepted: bool,
}

/// Receives every probe as it is measured.
pub trait SearchObserver {
    fn on_probe(&self, probe: &Probe);
}

impl<F: Fn(&Probe)> SearchObserver for F {
    fn on_probe(&self, probe: &Probe) {
        self(probe)
    }
}

/// Result of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub quality: Quality,
    pub iterations: u32,
    pub probes: Vec<Probe>,
}

/// Finds the lowest quality whose re-encoding stays within a tolerance.
///
/// Performs no I/O. Encode, decode and scoring are delegated to the
/// [`Codec`] and [`Metric`], and any failure from either aborts the search.
pub struct QualitySearcher<'a, C, M> {
    codec: &'a C,
    metric: &'a M,
    config: SearchConfig,
    settings: EncodeSettings,
    observer: Option<&'a dyn SearchObserver>,
}

impl<'a, C: Codec, M: Metric> QualitySearcher<'a, C, M> {
    pub fn new(codec: &'a C, metric: &'a M) -> Self {
        Self {
            codec,
            metric,
            config: SearchConfig::default(),
            settings: EncodeSettings::default(),
            observer: None,
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Settings for candidate encodes. Must match the final encode.
    pub fn with_settings(mut self, settings: EncodeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn SearchObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Search the configured bounds for the lowest quality with
    /// `difference <= eps`.
    ///
    /// Returns the upper bound at convergence: the lowest probed quality that
    /// was accepted, or the initial maximum if none was.
    pub fn find_quality(
        &self,
        original: &SourceImage,
        eps: Tolerance,
    ) -> Result<SearchOutcome, CodecError> {
        let reference = pipeline::fit(original, &self.settings);

        let mut min = self.config.bounds.min();
        let mut max = self.config.bounds.max();
        let mut probes = Vec::with_capacity(self.config.bounds.max_iterations() as usize);

        while max.get() - min.get() > 1 {
            let middle = min.midpoint(max);
            let diff = self.measure(&reference, middle)?;
            let accepted = eps.accepts(diff);

            if accepted {
                max = middle;
            } else {
                min = middle;
            }

            let probe = Probe {
                iteration: probes.len() as u32 + 1,
                quality: middle,
                diff,
                accepted,
            };
            tracing::trace!(
                iteration = probe.iteration,
                quality = middle.get(),
                diff,
                accepted,
                "probe"
            );
            if let Some(observer) = self.observer {
                observer.on_probe(&probe);
            }
            probes.push(probe);
        }

        Ok(SearchOutcome {
            quality: max,
            iterations: probes.len() as u32,
            probes,
        })
    }

    fn measure(&self, reference: &SourceImage, quality: Quality) -> Result<f64, CodecError> {
        let bytes = self.codec.encode(reference, quality, &self.settings)?;
        let candidate = self.codec.decode(&bytes)?;
        self.metric.difference(reference, &candidate)
    }
}
