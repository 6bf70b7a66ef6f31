use serde::Serialize;
use uuid::Uuid;

use super::model::{Session, SessionKind};
use crate::modules::ModuleId;

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    SessionStarted {
        session: Uuid,
        kind: SessionKind,
        resumed: bool,
    },
    ModuleStarted {
        session: Uuid,
        module: ModuleId,
        index: usize,
    },
    ModuleCompleted {
        session: Uuid,
        module: ModuleId,
        progress: f64,
    },
    ModuleSkipped {
        session: Uuid,
        module: ModuleId,
    },
    SessionCompleted {
        session: Uuid,
    },
    SessionAbandoned {
        session: Uuid,
    },
}

/// Receives progress events and post-change snapshots of the session.
///
/// Persistence lives behind this trait: a store can save each snapshot and
/// hand it back later through `SessionOrchestrator::restore`.
pub trait SessionObserver: Send {
    fn on_event(&mut self, event: &ProgressEvent);

    fn on_snapshot(&mut self, _session: &Session) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&mut self, event: &ProgressEvent) {
        tracing::info!(?event, "session progress");
    }
}
