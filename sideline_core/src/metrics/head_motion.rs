use serde::{Deserialize, Serialize};
use sideline_traits::PoseSample;

use super::rotation_angle_deg;
use crate::config::HeadMotionCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadState {
    /// Below the warning threshold.
    Still,
    /// Between the warning and event thresholds.
    Drifting,
    /// At or above the event threshold.
    Moving,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadMotionSummary {
    pub motion_events: u32,
    pub still_ms: u64,
    pub total_ms: u64,
    pub peak_deg: f64,
    pub valid: bool,
}

impl HeadMotionSummary {
    /// Fraction of observed time spent below the warning threshold.
    pub fn still_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            return 0.0;
        }
        self.still_ms as f64 / self.total_ms as f64
    }
}

/// Counts head-motion excursions relative to the first orientation seen.
///
/// An excursion starts when the angle reaches `event_deg` and ends as soon as
/// it falls back below it; each excursion counts one event.
#[derive(Debug, Clone)]
pub struct HeadMotionTracker {
    cfg: HeadMotionCfg,
    baseline: Option<[f64; 4]>,
    in_excursion: bool,
    events: u32,
    still_ms: u64,
    total_ms: u64,
    peak_deg: f64,
    last: Option<(u64, HeadState)>,
    valid: bool,
}

impl HeadMotionTracker {
    pub fn new(cfg: HeadMotionCfg) -> Self {
        Self {
            cfg,
            baseline: None,
            in_excursion: false,
            events: 0,
            still_ms: 0,
            total_ms: 0,
            peak_deg: 0.0,
            last: None,
            valid: true,
        }
    }

    pub fn classify(&self, angle_deg: f64) -> HeadState {
        if angle_deg >= self.cfg.event_deg {
            HeadState::Moving
        } else if angle_deg >= self.cfg.warn_deg {
            HeadState::Drifting
        } else {
            HeadState::Still
        }
    }

    /// Feed one sample; returns the state it puts the head in.
    ///
    /// The interval since the previous sample is credited to the previous
    /// sample's state.
    pub fn ingest(&mut self, sample: &PoseSample) -> Option<HeadState> {
        if !self.valid {
            return None;
        }
        let baseline = *self.baseline.get_or_insert(sample.orientation);
        let angle = rotation_angle_deg(&baseline, &sample.orientation);
        if !angle.is_finite() {
            return None;
        }
        let state = self.classify(angle);
        self.peak_deg = self.peak_deg.max(angle);

        if let Some((prev_ts, prev_state)) = self.last {
            let dt = sample.timestamp_ms.saturating_sub(prev_ts);
            self.total_ms += dt;
            if prev_state == HeadState::Still {
                self.still_ms += dt;
            }
        }
        self.last = Some((sample.timestamp_ms, state));

        match state {
            HeadState::Moving if !self.in_excursion => {
                self.in_excursion = true;
                self.events += 1;
                tracing::debug!(angle_deg = angle, events = self.events, "head motion event");
            }
            HeadState::Moving => {}
            HeadState::Still | HeadState::Drifting => self.in_excursion = false,
        }
        Some(state)
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn summary(&self) -> HeadMotionSummary {
        HeadMotionSummary {
            motion_events: self.events,
            still_ms: self.still_ms,
            total_ms: self.total_ms,
            peak_deg: self.peak_deg,
            valid: self.valid,
        }
    }
}
