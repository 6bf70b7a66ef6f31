use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use sideline_traits::PoseSample;

use super::{SwayBand, distance};
use crate::config::SwayCfg;

/// Sway summary for one recording segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwayMetrics {
    /// Largest displacement from the baseline position, metres.
    pub max_m: f64,
    /// RMS displacement over the most recent window, metres.
    pub rms_m: f64,
    pub band: SwayBand,
    pub samples: u64,
    /// `false` once tracking was lost during the segment.
    pub valid: bool,
}

/// Running sway aggregate for a single segment (one balance stance).
///
/// The first accepted sample becomes the baseline. Samples are dropped after
/// the segment is invalidated or finalized.
#[derive(Debug, Clone)]
pub struct SwayTracker {
    cfg: SwayCfg,
    baseline: Option<[f64; 3]>,
    window: VecDeque<f64>,
    max_m: f64,
    samples: u64,
    valid: bool,
    finalized: Option<SwayMetrics>,
}

impl SwayTracker {
    pub fn new(cfg: SwayCfg) -> Self {
        let window = VecDeque::with_capacity(cfg.window.max(1));
        Self {
            cfg,
            baseline: None,
            window,
            max_m: 0.0,
            samples: 0,
            valid: true,
            finalized: None,
        }
    }

    /// Feed one sample. Returns the displacement from baseline when accepted.
    pub fn ingest(&mut self, sample: &PoseSample) -> Option<f64> {
        if !self.valid || self.finalized.is_some() {
            return None;
        }
        let baseline = *self.baseline.get_or_insert(sample.position);
        let d = distance(&baseline, &sample.position);
        if !d.is_finite() {
            return None;
        }
        self.max_m = self.max_m.max(d);
        self.samples += 1;
        if self.window.len() == self.cfg.window.max(1) {
            self.window.pop_front();
        }
        self.window.push_back(d);
        Some(d)
    }

    pub fn rms(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let n = self.window.len() as f64;
        (self.window.iter().map(|d| d * d).sum::<f64>() / n).sqrt()
    }

    /// Mark this segment invalid after a tracking loss.
    pub fn invalidate(&mut self) {
        if self.valid && self.finalized.is_none() {
            tracing::info!(samples = self.samples, "sway segment invalidated");
        }
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn snapshot(&self) -> SwayMetrics {
        SwayMetrics {
            max_m: self.max_m,
            rms_m: self.rms(),
            band: SwayBand::classify(self.max_m, &self.cfg.bands_m),
            samples: self.samples,
            valid: self.valid,
        }
    }

    /// Freeze the aggregate. Later calls return the same value.
    pub fn finalize(&mut self) -> SwayMetrics {
        if let Some(done) = self.finalized {
            return done;
        }
        let done = self.snapshot();
        self.finalized = Some(done);
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, ts: u64) -> PoseSample {
        PoseSample::at([x, 0.0, 0.0], ts)
    }

    #[test]
    fn first_sample_is_baseline() {
        let mut t = SwayTracker::new(SwayCfg::default());
        assert_eq!(t.ingest(&at(1.0, 0)), Some(0.0));
        let d = t.ingest(&at(1.02, 33)).unwrap();
        assert!((d - 0.02).abs() < 1e-9);
        assert!((t.snapshot().max_m - 0.02).abs() < 1e-9);
    }

    #[test]
    fn rms_uses_bounded_window() {
        let cfg = SwayCfg {
            window: 2,
            bands_m: vec![0.01, 0.025, 0.05],
        };
        let mut t = SwayTracker::new(cfg);
        t.ingest(&at(0.0, 0));
        t.ingest(&at(3.0, 1));
        t.ingest(&at(4.0, 2));
        // window holds 3 and 4
        assert!((t.rms() - (12.5f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn invalidated_segment_ignores_samples() {
        let mut t = SwayTracker::new(SwayCfg::default());
        t.ingest(&at(0.0, 0));
        t.invalidate();
        assert_eq!(t.ingest(&at(1.0, 1)), None);
        assert!(!t.finalize().valid);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut t = SwayTracker::new(SwayCfg::default());
        t.ingest(&at(0.0, 0));
        t.ingest(&at(0.03, 1));
        let first = t.finalize();
        t.ingest(&at(0.5, 2));
        assert_eq!(t.finalize(), first);
        assert_eq!(first.band, SwayBand::Significant);
    }
}
