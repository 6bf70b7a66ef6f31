//! Session driver: owns the orchestrator, the router and the active module,
//! and moves a session from one module to the next.
//!
//! Everything here is single-threaded and clock-injected. `SessionRuntime`
//! wraps a driver in a worker thread for live use; tests and replays call it
//! directly with a `ManualClock`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::Serialize;
use sideline_traits::PoseSample;
use uuid::Uuid;

use crate::config::AssessCfg;
use crate::error::AssessError;
use crate::metrics::{LiveMetrics, SensorMetricsProcessor};
use crate::modules::{
    AssessmentModule, HostedModule, ModuleContext, ModuleFactory, ModuleId, ModuleResult,
    SharedClock,
};
use crate::session::{Advance, Recorded, Session, SessionKind, SessionObserver, SessionOrchestrator};
use crate::status::ModuleStatus;
use crate::voice::{DispatchOutcome, Registration, TranscriptEvent, VoiceCommand, VoiceCommandRouter};

/// Notable things that happened while driving a session, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DriverEvent {
    SessionStarted { session: Uuid, resumed: bool },
    ModuleStarted { module: ModuleId },
    ModuleCompleted {
        module: ModuleId,
        result: ModuleResult,
        progress: f64,
    },
    ModuleSkipped { module: ModuleId },
    /// The examiner left the module; the session stays resumable.
    ModuleExited { module: ModuleId },
    SessionComplete { session: Uuid },
    /// Nothing left but skipped modules.
    AwaitingSkipped { modules: Vec<ModuleId> },
    SessionAbandoned { session: Uuid },
    /// Recognition keeps failing; the UI should offer manual controls.
    FallbackPrompt,
}

struct ActiveModule {
    hosted: HostedModule,
    registration: Registration,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SessionDriver {
    clock: SharedClock,
    epoch: Instant,
    wall_anchor: DateTime<Local>,
    factory: ModuleFactory,
    orchestrator: SessionOrchestrator,
    router: VoiceCommandRouter,
    metrics: SensorMetricsProcessor,
    session_id: Option<Uuid>,
    active: Option<ActiveModule>,
    learned_at: Option<Instant>,
    tracking: bool,
    events: Vec<DriverEvent>,
}

impl std::fmt::Debug for SessionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDriver")
            .field("session", &self.session_id)
            .field("active", &self.active_module())
            .field("tracking", &self.tracking)
            .finish_non_exhaustive()
    }
}

impl SessionDriver {
    pub fn builder() -> crate::builder::SessionDriverBuilder {
        crate::builder::SessionDriverBuilder::default()
    }

    pub(crate) fn from_parts(
        cfg: Arc<AssessCfg>,
        clock: SharedClock,
        wall_anchor: DateTime<Local>,
        observers: Vec<Box<dyn SessionObserver>>,
    ) -> Self {
        let mut orchestrator =
            SessionOrchestrator::new(cfg.orders.clone(), cfg.protocol.session_word_list());
        for o in observers {
            orchestrator.add_observer(o);
        }
        Self {
            epoch: clock.now(),
            wall_anchor,
            factory: ModuleFactory::new(cfg.clone(), clock.clone()),
            router: VoiceCommandRouter::new(cfg.recognition),
            metrics: SensorMetricsProcessor::new(cfg.sway.clone(), cfg.head_motion),
            clock,
            orchestrator,
            session_id: None,
            active: None,
            learned_at: None,
            tracking: true,
            events: Vec::new(),
        }
    }

    pub fn clock(&self) -> SharedClock {
        self.clock.clone()
    }

    /// Local wall-clock time: the anchor plus time elapsed on the injected clock.
    pub fn wall_now(&self) -> DateTime<Local> {
        let elapsed = i64::try_from(self.clock.ms_since(self.epoch)).unwrap_or(i64::MAX);
        self.wall_anchor + TimeDelta::milliseconds(elapsed)
    }

    /// Load a persisted session so `start` can resume it.
    pub fn restore(&mut self, session: Session) -> Result<(), AssessError> {
        self.orchestrator.restore(session)
    }

    /// Create or resume a session of `kind` and activate its first pending module.
    pub fn start(&mut self, kind: SessionKind) -> Result<Uuid, AssessError> {
        if let Some(active) = &self.active {
            return Err(AssessError::transition(format!(
                "{} is still running",
                active.hosted.id
            )));
        }
        let before = self.orchestrator.sessions().len();
        let session = self.orchestrator.create_or_resume(kind);
        let sid = session.id;
        let recall_done_at = session
            .result(ModuleId::ImmediateRecall)
            .map(ModuleResult::completed_at);
        let resumed = self.orchestrator.sessions().len() == before;

        self.session_id = Some(sid);
        self.learned_at = recall_done_at.map(|at| self.instant_for(at));
        tracing::info!(session = %sid, %kind, resumed, "session started");
        self.events.push(DriverEvent::SessionStarted {
            session: sid,
            resumed,
        });
        self.advance(sid)?;
        Ok(sid)
    }

    /// Map a recorded wall-clock time onto the injected clock.
    fn instant_for(&self, at: DateTime<Utc>) -> Instant {
        let ago = self.wall_now().with_timezone(&Utc) - at;
        let ago = Duration::from_millis(u64::try_from(ago.num_milliseconds()).unwrap_or(0));
        earliest_before(self.clock.now(), ago)
    }

    fn advance(&mut self, sid: Uuid) -> Result<(), AssessError> {
        match self.orchestrator.advance(sid)? {
            Advance::Next(module) => self.activate(sid, module),
            Advance::AllComplete => {
                self.events.push(DriverEvent::SessionComplete { session: sid });
                Ok(())
            }
            Advance::OnlySkipped(modules) => {
                tracing::info!(session = %sid, ?modules, "only skipped modules remain");
                self.events.push(DriverEvent::AwaitingSkipped { modules });
                Ok(())
            }
        }
    }

    fn activate(&mut self, sid: Uuid, module: ModuleId) -> Result<(), AssessError> {
        let session = self
            .orchestrator
            .session(sid)
            .ok_or_else(|| AssessError::transition(format!("unknown session {sid}")))?;
        let wall = self.wall_now();
        let ctx = ModuleContext {
            word_list: session.word_list.clone(),
            learned_at: self.learned_at,
            wall_origin: wall.with_timezone(&Utc),
            local_now: wall.naive_local(),
        };
        let hosted = self.factory.build(module, &ctx);
        if !self.tracking {
            lock(&hosted.module).on_tracking(false);
        }
        let registration = self.router.set_active_controller(&hosted.receiver);
        self.metrics.reset();
        tracing::info!(session = %sid, %module, "module activated");
        self.active = Some(ActiveModule {
            hosted,
            registration,
        });
        self.events.push(DriverEvent::ModuleStarted { module });
        Ok(())
    }

    fn deactivate(&mut self) -> Option<HostedModule> {
        let active = self.active.take()?;
        self.router.clear_active_controller(&active.registration);
        Some(active.hosted)
    }

    /// Route one recognizer transcript, then settle the module.
    pub fn on_transcript(
        &mut self,
        event: TranscriptEvent,
    ) -> Result<Vec<DispatchOutcome>, AssessError> {
        let outcomes = self.router.handle(event);
        if outcomes
            .iter()
            .any(|o| matches!(o, DispatchOutcome::FallbackPrompt))
        {
            self.events.push(DriverEvent::FallbackPrompt);
        }
        self.tick()?;
        Ok(outcomes)
    }

    /// Manual tap or button press. Same entry point as voice.
    pub fn on_manual(&mut self, command: VoiceCommand) -> Result<DispatchOutcome, AssessError> {
        let outcome = self.router.dispatch_manual(command);
        self.tick()?;
        Ok(outcome)
    }

    /// Gesture recognizer active: speech is ignored while it is.
    pub fn set_gesture_active(&mut self, active: bool) {
        self.router.set_suppressed(active);
    }

    pub fn on_pose(&mut self, sample: &PoseSample) {
        self.metrics.ingest(sample);
        if let Some(active) = &self.active {
            lock(&active.hosted.module).on_pose(sample);
        }
    }

    pub fn on_focus(&mut self, focused: bool) {
        if let Some(active) = &self.active {
            lock(&active.hosted.module).on_focus(focused);
        }
    }

    /// Tracking availability. Repeated reports of the same state are ignored.
    pub fn on_tracking(&mut self, available: bool) {
        if self.tracking == available {
            return;
        }
        self.tracking = available;
        if available {
            tracing::info!("pose tracking restored");
        } else {
            tracing::warn!(error = %AssessError::SensorUnavailable, "pose tracking lost");
            self.metrics.tracking_lost();
        }
        if let Some(active) = &self.active {
            lock(&active.hosted.module).on_tracking(available);
        }
    }

    /// Poll the active module and act on a terminal status.
    pub fn tick(&mut self) -> Result<(), AssessError> {
        let (Some(sid), Some(active)) = (self.session_id, &self.active) else {
            return Ok(());
        };
        let status = lock(&active.hosted.module).poll();
        if !status.is_terminal() {
            return Ok(());
        }
        let Some(hosted) = self.deactivate() else {
            return Ok(());
        };
        let module = hosted.id;
        match status {
            ModuleStatus::Running => Ok(()),
            ModuleStatus::Complete => {
                let result = lock(&hosted.module).finalize()?;
                if module == ModuleId::ImmediateRecall {
                    self.learned_at = Some(self.clock.now());
                }
                let recorded = self
                    .orchestrator
                    .record_completion(sid, module, result.clone())?;
                let progress = match recorded {
                    Recorded::Stored { progress, .. } => progress,
                    Recorded::Duplicate => self
                        .orchestrator
                        .session(sid)
                        .map_or(0.0, Session::progress),
                };
                self.events.push(DriverEvent::ModuleCompleted {
                    module,
                    result,
                    progress,
                });
                self.advance(sid)
            }
            ModuleStatus::Skipped => {
                lock(&hosted.module).cancel();
                self.orchestrator.skip(sid, module)?;
                self.events.push(DriverEvent::ModuleSkipped { module });
                self.advance(sid)
            }
            ModuleStatus::Exited => {
                lock(&hosted.module).cancel();
                tracing::info!(session = %sid, %module, "module exited; session paused");
                self.events.push(DriverEvent::ModuleExited { module });
                Ok(())
            }
        }
    }

    /// Re-enter the session after an exit: activates the next pending module.
    pub fn resume(&mut self) -> Result<(), AssessError> {
        if self.active.is_some() {
            return Ok(());
        }
        let sid = self.require_session()?;
        self.advance(sid)
    }

    /// Make skipped modules eligible again and continue with them.
    pub fn retry_skipped(&mut self) -> Result<Vec<ModuleId>, AssessError> {
        let sid = self.require_session()?;
        let cleared = self.orchestrator.retry_skipped(sid)?;
        if self.active.is_none() && !cleared.is_empty() {
            self.advance(sid)?;
        }
        Ok(cleared)
    }

    /// Abandon the session. The active module is cancelled and discarded.
    pub fn cancel(&mut self) -> Result<(), AssessError> {
        let sid = self.require_session()?;
        if let Some(hosted) = self.deactivate() {
            lock(&hosted.module).cancel();
        }
        let was_open = self.session().is_some_and(Session::is_open);
        self.orchestrator.abandon(sid)?;
        if was_open {
            self.events.push(DriverEvent::SessionAbandoned { session: sid });
        }
        Ok(())
    }

    fn require_session(&self) -> Result<Uuid, AssessError> {
        self.session_id
            .ok_or_else(|| AssessError::transition("no session started"))
    }

    /// Events since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<DriverEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session_id.and_then(|id| self.orchestrator.session(id))
    }

    pub fn sessions(&self) -> &[Session] {
        self.orchestrator.sessions()
    }

    pub fn active_module(&self) -> Option<ModuleId> {
        self.active.as_ref().map(|a| a.hosted.id)
    }

    pub fn is_finished(&self) -> bool {
        self.session().is_some_and(|s| !s.is_open())
    }

    pub fn live_metrics(&self) -> LiveMetrics {
        self.metrics.snapshot()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Run `f` against the active module, for status displays.
    pub fn with_active<R>(&self, f: impl FnOnce(&mut dyn AssessmentModule) -> R) -> Option<R> {
        let active = self.active.as_ref()?;
        let mut guard = lock(&active.hosted.module);
        Some(f(&mut *guard))
    }
}

/// `now - ago`, clamped to the earliest instant the platform can represent.
fn earliest_before(now: Instant, mut ago: Duration) -> Instant {
    loop {
        if let Some(at) = now.checked_sub(ago) {
            return at;
        }
        ago /= 2;
    }
}
