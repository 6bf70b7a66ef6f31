//! Sensor-derived metrics: postural sway, head motion and gaze focus.
//!
//! Each tracker aggregates one segment of a recording. A tracking loss
//! invalidates the segment it happens in; other segments are unaffected.

pub mod focus;
pub mod head_motion;
pub mod sway;

pub use focus::{Axis, FocusSegment, FocusTracker};
pub use head_motion::{HeadMotionSummary, HeadMotionTracker, HeadState};
pub use sway::{SwayMetrics, SwayTracker};

use serde::{Deserialize, Serialize};
use sideline_traits::PoseSample;

use crate::config::{HeadMotionCfg, SwayCfg};

/// Sway severity, by maximum displacement against the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwayBand {
    Minimal,
    Moderate,
    Significant,
    High,
}

impl SwayBand {
    /// `bounds` are ascending upper limits for Minimal, Moderate, Significant.
    pub fn classify(displacement_m: f64, bounds: &[f64]) -> Self {
        const BANDS: [SwayBand; 3] = [SwayBand::Minimal, SwayBand::Moderate, SwayBand::Significant];
        BANDS
            .iter()
            .zip(bounds)
            .find(|(_, limit)| displacement_m < **limit)
            .map_or(SwayBand::High, |(band, _)| *band)
    }
}

pub(crate) fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn normalized(q: &[f64; 4]) -> Option<[f64; 4]> {
    let norm = q.iter().map(|c| c * c).sum::<f64>().sqrt();
    (norm > f64::EPSILON).then(|| q.map(|c| c / norm))
}

/// Angle of the rotation taking `from` to `to`, in degrees (`0..=180`).
pub fn rotation_angle_deg(from: &[f64; 4], to: &[f64; 4]) -> f64 {
    let (Some(a), Some(b)) = (normalized(from), normalized(to)) else {
        return f64::NAN;
    };
    let dot = a.iter().zip(&b).map(|(x, y)| x * y).sum::<f64>().abs().min(1.0);
    2.0 * dot.acos().to_degrees()
}

/// Live sway and head-motion readout over the whole pose stream.
///
/// Modules keep their own per-segment trackers; this one feeds status
/// displays and is reset by the caller between modules.
#[derive(Debug, Clone)]
pub struct SensorMetricsProcessor {
    sway_cfg: SwayCfg,
    head_cfg: HeadMotionCfg,
    sway: SwayTracker,
    head: HeadMotionTracker,
    last_state: Option<HeadState>,
}

/// Snapshot returned by [`SensorMetricsProcessor::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub sway: SwayMetrics,
    pub head: HeadMotionSummary,
    pub head_state: Option<HeadState>,
}

impl SensorMetricsProcessor {
    pub fn new(sway_cfg: SwayCfg, head_cfg: HeadMotionCfg) -> Self {
        Self {
            sway: SwayTracker::new(sway_cfg.clone()),
            head: HeadMotionTracker::new(head_cfg),
            sway_cfg,
            head_cfg,
            last_state: None,
        }
    }

    pub fn ingest(&mut self, sample: &PoseSample) {
        self.sway.ingest(sample);
        if let Some(state) = self.head.ingest(sample) {
            self.last_state = Some(state);
        }
    }

    pub fn tracking_lost(&mut self) {
        self.sway.invalidate();
        self.head.invalidate();
    }

    /// Start a fresh segment with a new baseline.
    pub fn reset(&mut self) {
        self.sway = SwayTracker::new(self.sway_cfg.clone());
        self.head = HeadMotionTracker::new(self.head_cfg);
        self.last_state = None;
    }

    pub fn snapshot(&self) -> LiveMetrics {
        LiveMetrics {
            sway: self.sway.snapshot(),
            head: self.head.summary(),
            head_state: self.last_state,
        }
    }
}
