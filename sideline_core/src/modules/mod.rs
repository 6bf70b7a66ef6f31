//! Assessment module state machines.
//!
//! Every module exposes two faces:
//! - [`CommandReceiver`]: what the voice router talks to (vocabulary and
//!   `execute`). Manual taps use the same `execute`.
//! - [`AssessmentModule`]: what the session driver talks to (timers via
//!   `poll`, sensor input, finalization).
//!
//! Modules read time only through the injected [`Clock`], so a
//! `ManualClock` drives them deterministically.

pub mod balance;
pub mod coordination;
pub mod digit_span;
pub mod factory;
pub mod months_reverse;
pub mod orientation;
pub mod recall;
pub mod result;
pub mod smooth_pursuit;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sideline_traits::{Clock, PoseSample};

use crate::error::AssessError;
use crate::status::ModuleStatus;
use crate::voice::{SharedReceiver, Vocabulary, VoiceCommand};

pub use factory::{ModuleContext, ModuleFactory};
pub use result::ModuleResult;

/// Clock handle shared by every module in a session.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    Orientation,
    ImmediateRecall,
    DigitSpan,
    MonthsReverse,
    Balance,
    Coordination,
    SmoothPursuit,
    DelayedRecall,
}

impl ModuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleId::Orientation => "orientation",
            ModuleId::ImmediateRecall => "immediate_recall",
            ModuleId::DigitSpan => "digit_span",
            ModuleId::MonthsReverse => "months_reverse",
            ModuleId::Balance => "balance",
            ModuleId::Coordination => "coordination",
            ModuleId::SmoothPursuit => "smooth_pursuit",
            ModuleId::DelayedRecall => "delayed_recall",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Router-facing side of a module.
pub trait CommandReceiver {
    /// Effective alias table, module entries first.
    fn vocabulary(&self) -> &Vocabulary;

    /// Names accepted through `SelectByName`, in declaration order.
    fn names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether unmatched speech should be delivered as `Answer`.
    fn accepts_answers(&self) -> bool {
        false
    }

    /// Apply one command. Errors leave the module state unchanged.
    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError>;
}

/// Driver-facing side of a module.
pub trait AssessmentModule: CommandReceiver + Send {
    fn id(&self) -> ModuleId;

    /// Advance timers and report where the module stands.
    fn poll(&mut self) -> ModuleStatus;

    fn on_pose(&mut self, _sample: &PoseSample) {}

    fn on_focus(&mut self, _focused: bool) {}

    /// Tracking availability changed. Losing it invalidates the current
    /// metrics segment.
    fn on_tracking(&mut self, _available: bool) {}

    /// Stop all timers. Called when the module is torn down early.
    fn cancel(&mut self);

    /// Produce the result. A second call returns `AlreadyFinalized`.
    fn finalize(&mut self) -> Result<ModuleResult, AssessError>;
}

/// Shared bookkeeping every module embeds.
pub struct ModuleCore {
    id: ModuleId,
    clock: SharedClock,
    epoch: Instant,
    wall_origin: DateTime<Utc>,
    vocabulary: Vocabulary,
    early_exit: Option<ModuleStatus>,
    finalized: bool,
}

impl ModuleCore {
    /// `wall_origin` is the wall-clock time matching the module's start; result
    /// timestamps are derived from it and the injected clock.
    pub fn new(
        id: ModuleId,
        clock: SharedClock,
        wall_origin: DateTime<Utc>,
        vocabulary: Vocabulary,
    ) -> Self {
        let epoch = clock.now();
        Self {
            id,
            clock,
            epoch,
            wall_origin,
            vocabulary,
            early_exit: None,
            finalized: false,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Milliseconds since the module was created.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn wall_now(&self) -> DateTime<Utc> {
        let elapsed = i64::try_from(self.now_ms()).unwrap_or(i64::MAX);
        self.wall_origin + TimeDelta::milliseconds(elapsed)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Reject commands once the module has stopped taking input.
    pub fn ensure_open(&self) -> Result<(), AssessError> {
        if self.finalized {
            return Err(AssessError::AlreadyFinalized);
        }
        if let Some(status) = self.early_exit {
            return Err(AssessError::transition(format!(
                "{} already ended ({status:?})",
                self.id
            )));
        }
        Ok(())
    }

    /// Handle `Skip` and `Exit`. Returns `true` when the command was consumed.
    pub fn handle_common(&mut self, command: &VoiceCommand) -> bool {
        let status = match command {
            VoiceCommand::Skip => ModuleStatus::Skipped,
            VoiceCommand::Exit => ModuleStatus::Exited,
            _ => return false,
        };
        tracing::info!(module = %self.id, ?status, "module ended by examiner");
        self.early_exit = Some(status);
        true
    }

    pub fn early_exit(&self) -> Option<ModuleStatus> {
        self.early_exit
    }

    pub fn begin_finalize(&mut self) -> Result<(), AssessError> {
        if self.finalized {
            return Err(AssessError::AlreadyFinalized);
        }
        self.finalized = true;
        Ok(())
    }

    pub fn rejected(&self, command: &VoiceCommand, state: impl fmt::Debug) -> AssessError {
        AssessError::transition(format!(
            "{} cannot {} while {state:?}",
            self.id,
            command.label()
        ))
    }
}

/// A module shared between the driver (as [`AssessmentModule`]) and the
/// router (as [`CommandReceiver`]).
#[derive(Clone)]
pub struct HostedModule {
    pub id: ModuleId,
    pub module: Arc<Mutex<dyn AssessmentModule>>,
    pub receiver: SharedReceiver,
}

impl HostedModule {
    pub fn new<M: AssessmentModule + 'static>(module: M) -> Self {
        let id = module.id();
        let shared = Arc::new(Mutex::new(module));
        Self {
            id,
            module: shared.clone(),
            receiver: shared,
        }
    }
}

impl fmt::Debug for HostedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedModule").field("id", &self.id).finish()
    }
}
