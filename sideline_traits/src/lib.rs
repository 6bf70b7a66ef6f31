//! Collaborator seams shared across the sideline workspace.
//!
//! Nothing in here knows about clinical modules: the clock abstraction and the
//! pose supplier are the only things the core needs from the outside world.
pub mod clock;
pub mod pose;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use pose::{PoseSample, PoseSource};
