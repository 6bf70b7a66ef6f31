//! Test and helper mocks for sideline_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sideline_traits::{PoseSample, PoseSource};

use crate::session::{ProgressEvent, Session, SessionObserver};

/// A pose source that always times out; models a headset with tracking
/// unavailable.
pub struct NoopPoseSource;

impl PoseSource for NoopPoseSource {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<PoseSample, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(timeout);
        Err(Box::new(std::io::Error::other("tracking unavailable")))
    }
}

/// Deterministic synthetic head: a slow elliptical sway of `amplitude_m`
/// metres with a small periodic yaw, advancing `step_ms` per read.
pub struct SimulatedPoseSource {
    amplitude_m: f64,
    yaw_deg: f64,
    step_ms: u64,
    t_ms: u64,
}

impl SimulatedPoseSource {
    pub fn new(amplitude_m: f64, yaw_deg: f64, step_ms: u64) -> Self {
        Self {
            amplitude_m,
            yaw_deg,
            step_ms: step_ms.max(1),
            t_ms: 0,
        }
    }

    fn sample_at(&self, t_ms: u64) -> PoseSample {
        let t = t_ms as f64 / 1000.0;
        let phase = t * std::f64::consts::TAU / 4.0;
        let position = [
            self.amplitude_m * phase.sin(),
            1.6,
            self.amplitude_m * 0.5 * (phase * 0.5).cos() - self.amplitude_m * 0.5,
        ];
        let half = (self.yaw_deg * (phase * 0.25).sin()).to_radians() / 2.0;
        PoseSample::new(position, [0.0, half.sin(), 0.0, half.cos()], t_ms)
    }
}

impl Default for SimulatedPoseSource {
    fn default() -> Self {
        Self::new(0.015, 3.0, 33)
    }
}

impl PoseSource for SimulatedPoseSource {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<PoseSample, Box<dyn std::error::Error + Send + Sync>> {
        let s = self.sample_at(self.t_ms);
        self.t_ms += self.step_ms;
        Ok(s)
    }
}

/// Replays a fixed list of samples, then times out like `NoopPoseSource`.
pub struct ScriptedPoseSource {
    samples: VecDeque<PoseSample>,
}

impl ScriptedPoseSource {
    pub fn new(samples: impl IntoIterator<Item = PoseSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

impl PoseSource for ScriptedPoseSource {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<PoseSample, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(sample) = self.samples.pop_front() {
            return Ok(sample);
        }
        std::thread::sleep(timeout);
        Err(Box::new(std::io::Error::other("script exhausted")))
    }
}

/// Observer that keeps every event and the latest snapshot; clones share
/// storage so a test can keep one clone and hand the other to the engine.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    last: Arc<Mutex<Option<Session>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_snapshot(&self) -> Option<Session> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn on_snapshot(&mut self, session: &Session) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
    }
}
