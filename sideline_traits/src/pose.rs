//! Pose supplier seam for the spatial-tracking collaborator.

use std::time::Duration;

/// One tracked head pose.
///
/// `position` is in metres, `orientation` is a unit quaternion stored as
/// `[x, y, z, w]`, `timestamp_ms` is monotonic milliseconds from the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
    pub timestamp_ms: u64,
}

impl PoseSample {
    pub const IDENTITY_ORIENTATION: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

    pub fn new(position: [f64; 3], orientation: [f64; 4], timestamp_ms: u64) -> Self {
        Self {
            position,
            orientation,
            timestamp_ms,
        }
    }

    /// Sample at `position` with identity orientation.
    pub fn at(position: [f64; 3], timestamp_ms: u64) -> Self {
        Self::new(position, Self::IDENTITY_ORIENTATION, timestamp_ms)
    }
}

/// Blocking pose source. `read` waits up to `timeout` for the next sample.
///
/// An `Err` means tracking is currently unavailable; callers treat it as a
/// transient condition and keep polling.
pub trait PoseSource {
    fn read(&mut self, timeout: Duration)
    -> Result<PoseSample, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: PoseSource + ?Sized> PoseSource for Box<T> {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<PoseSample, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }
}
