//! Routes recognized speech to whichever module controller is active.
//!
//! The router holds a single non-owning slot. Registering a controller bumps a
//! generation counter; transcripts queued under an older generation are dropped
//! instead of reaching the newer controller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::config::RecognitionCfg;
use crate::error::AssessError;
use crate::modules::CommandReceiver;

use super::command::{TranscriptEvent, VoiceCommand};
use super::normalize::normalize;

/// Shared handle to a module controller.
pub type SharedReceiver = Arc<Mutex<dyn CommandReceiver + Send>>;

type WeakReceiver = Weak<Mutex<dyn CommandReceiver + Send>>;

/// Proof of registration, needed to clear the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    generation: u64,
}

impl Registration {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to one transcript or manual command.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Executed by the active controller.
    Dispatched(VoiceCommand),
    /// Resolved, but the controller refused it in its current state.
    Rejected {
        command: VoiceCommand,
        error: AssessError,
    },
    /// Partial transcript; waiting for the final one.
    Provisional,
    /// Dropped while the gesture recognizer is active.
    Suppressed,
    /// No controller registered, or it has gone away.
    NoController,
    /// Queued for a controller that has since been replaced.
    Superseded,
    /// Below the minimum recognizer confidence.
    LowConfidence,
    /// Nothing in the active vocabulary matched.
    NoMatch,
    /// Too many consecutive failures; ask the examiner for manual input.
    FallbackPrompt,
}

impl DispatchOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched(_))
    }
}

struct Slot {
    generation: u64,
    controller: WeakReceiver,
}

struct Queued {
    generation: Option<u64>,
    event: TranscriptEvent,
}

pub struct VoiceCommandRouter {
    cfg: RecognitionCfg,
    slot: Option<Slot>,
    generation: u64,
    suppressed: bool,
    queue: VecDeque<Queued>,
    failure_streak: u32,
}

impl VoiceCommandRouter {
    pub fn new(cfg: RecognitionCfg) -> Self {
        Self {
            cfg,
            slot: None,
            generation: 0,
            suppressed: false,
            queue: VecDeque::new(),
            failure_streak: 0,
        }
    }

    /// Make `controller` the only recipient of commands. Any previous controller
    /// is replaced; transcripts already queued for it are superseded.
    pub fn set_active_controller(&mut self, controller: &SharedReceiver) -> Registration {
        self.generation = self.generation.wrapping_add(1);
        self.slot = Some(Slot {
            generation: self.generation,
            controller: Arc::downgrade(controller),
        });
        self.failure_streak = 0;
        tracing::debug!(generation = self.generation, "controller registered");
        Registration {
            generation: self.generation,
        }
    }

    /// Clear the slot if `registration` still owns it. Returns whether it did.
    pub fn clear_active_controller(&mut self, registration: &Registration) -> bool {
        match &self.slot {
            Some(slot) if slot.generation == registration.generation => {
                self.slot = None;
                tracing::debug!(generation = registration.generation, "controller cleared");
                true
            }
            _ => false,
        }
    }

    pub fn has_controller(&self) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|s| s.controller.strong_count() > 0)
    }

    /// While suppressed, final transcripts are dropped rather than dispatched.
    pub fn set_suppressed(&mut self, suppressed: bool) {
        if self.suppressed != suppressed {
            tracing::debug!(suppressed, "voice suppression changed");
        }
        self.suppressed = suppressed;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Enqueue a transcript for the controller active right now.
    pub fn submit(&mut self, event: TranscriptEvent) {
        let generation = self.slot.as_ref().map(|s| s.generation);
        self.queue.push_back(Queued { generation, event });
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Process the oldest queued transcript.
    pub fn process_next(&mut self) -> Option<DispatchOutcome> {
        let queued = self.queue.pop_front()?;
        Some(self.route(queued))
    }

    /// Submit and process in one step, draining anything queued before it.
    pub fn handle(&mut self, event: TranscriptEvent) -> Vec<DispatchOutcome> {
        self.submit(event);
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(outcome) = self.process_next() {
            out.push(outcome);
        }
        out
    }

    /// Manual input path. Skips vocabulary matching and suppression but uses
    /// the same `execute` entry point as voice.
    pub fn dispatch_manual(&mut self, command: VoiceCommand) -> DispatchOutcome {
        let Some(controller) = self.live_controller() else {
            return DispatchOutcome::NoController;
        };
        self.failure_streak = 0;
        let mut guard = controller.lock().unwrap_or_else(PoisonError::into_inner);
        execute(&mut *guard, command, "manual")
    }

    fn live_controller(&mut self) -> Option<SharedReceiver> {
        let controller = self.slot.as_ref()?.controller.upgrade();
        if controller.is_none() {
            self.slot = None;
        }
        controller
    }

    fn route(&mut self, queued: Queued) -> DispatchOutcome {
        let Queued { generation, event } = queued;
        if !event.is_final {
            return DispatchOutcome::Provisional;
        }
        if self.suppressed {
            tracing::debug!(text = %event.text, "transcript suppressed");
            return DispatchOutcome::Suppressed;
        }
        let current = self.slot.as_ref().map(|s| s.generation);
        if current.is_none() {
            return DispatchOutcome::NoController;
        }
        if generation != current {
            tracing::debug!(text = %event.text, "transcript superseded by newer controller");
            return DispatchOutcome::Superseded;
        }
        let Some(controller) = self.live_controller() else {
            return DispatchOutcome::NoController;
        };
        if let Some(conf) = event.confidence
            && conf < self.cfg.min_confidence
        {
            tracing::info!(text = %event.text, confidence = conf, "low-confidence transcript");
            return self.failure(DispatchOutcome::LowConfidence);
        }

        let normalized = normalize(&event.text);
        let mut guard = controller.lock().unwrap_or_else(PoisonError::into_inner);
        let resolved = guard
            .vocabulary()
            .resolve(&normalized, &guard.names(), guard.accepts_answers());
        match resolved {
            Some(command) => {
                self.failure_streak = 0;
                execute(&mut *guard, command, "voice")
            }
            None => {
                drop(guard);
                tracing::info!(text = %normalized, "transcript matched no command");
                self.failure(DispatchOutcome::NoMatch)
            }
        }
    }

    fn failure(&mut self, outcome: DispatchOutcome) -> DispatchOutcome {
        self.failure_streak += 1;
        if self.failure_streak >= self.cfg.fallback_after {
            self.failure_streak = 0;
            tracing::warn!("repeated recognition failures; prompting for manual input");
            DispatchOutcome::FallbackPrompt
        } else {
            outcome
        }
    }
}

fn execute(
    receiver: &mut (dyn CommandReceiver + Send),
    command: VoiceCommand,
    source: &'static str,
) -> DispatchOutcome {
    match receiver.execute(command.clone()) {
        Ok(()) => {
            tracing::debug!(command = command.label(), source, "command dispatched");
            DispatchOutcome::Dispatched(command)
        }
        Err(error) => {
            tracing::warn!(command = command.label(), source, %error, "command rejected");
            DispatchOutcome::Rejected { command, error }
        }
    }
}
