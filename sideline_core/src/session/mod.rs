//! Session model, lifecycle and progress notifications.

pub mod model;
pub mod observer;
pub mod orchestrator;

pub use model::{Session, SessionKind, SessionProgress, SessionStatus};
pub use observer::{ProgressEvent, SessionObserver, TracingObserver};
pub use orchestrator::{Advance, Recorded, SessionOrchestrator};
