//! Tandem gait: timed walking trials marked by the examiner.

use super::result::{CoordinationResult, GaitTrial};
use super::{AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult};
use crate::error::AssessError;
use crate::status::ModuleStatus;
use crate::timer::Countdown;
use crate::voice::{Vocabulary, VoiceCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitPhase {
    Ready,
    Walking,
    Done,
}

pub struct CoordinationModule {
    core: ModuleCore,
    phase: GaitPhase,
    trials_total: usize,
    countdown: Countdown,
    trials: Vec<GaitTrial>,
}

impl CoordinationModule {
    pub fn new(core: ModuleCore, trials: u32, trial_ms: u64) -> Self {
        Self {
            core,
            phase: GaitPhase::Ready,
            trials_total: usize::try_from(trials.max(1)).unwrap_or(1),
            countdown: Countdown::new(trial_ms),
            trials: Vec::new(),
        }
    }

    pub fn phase(&self) -> GaitPhase {
        self.phase
    }

    fn record(&mut self, trial: GaitTrial) {
        self.countdown.cancel();
        tracing::info!(
            trial = self.trials.len() + 1,
            passed = trial.passed,
            duration_ms = ?trial.duration_ms,
            timed_out = trial.timed_out,
            "gait trial recorded"
        );
        self.trials.push(trial);
        self.phase = if self.trials.len() >= self.trials_total {
            GaitPhase::Done
        } else {
            GaitPhase::Ready
        };
    }

    fn settle(&mut self, now: u64) {
        if self.phase == GaitPhase::Walking && self.countdown.poll(now) {
            self.record(GaitTrial {
                duration_ms: None,
                passed: false,
                timed_out: true,
            });
        }
    }
}

impl CommandReceiver for CoordinationModule {
    fn vocabulary(&self) -> &Vocabulary {
        self.core.vocabulary()
    }

    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError> {
        self.core.ensure_open()?;
        if self.core.handle_common(&command) {
            self.countdown.cancel();
            return Ok(());
        }
        let now = self.core.now_ms();
        self.settle(now);

        match (&command, self.phase) {
            (VoiceCommand::Start | VoiceCommand::Select, GaitPhase::Ready) => {
                self.countdown.start(now);
                self.phase = GaitPhase::Walking;
            }
            // Trial not attempted.
            (VoiceCommand::Next, GaitPhase::Ready) => self.record(GaitTrial {
                duration_ms: None,
                passed: false,
                timed_out: false,
            }),
            (VoiceCommand::Stop | VoiceCommand::MarkCorrect, GaitPhase::Walking) => {
                let elapsed = self.countdown.elapsed_ms(now);
                self.record(GaitTrial {
                    duration_ms: Some(elapsed),
                    passed: true,
                    timed_out: false,
                });
            }
            (VoiceCommand::MarkIncorrect, GaitPhase::Walking) => {
                let elapsed = self.countdown.elapsed_ms(now);
                self.record(GaitTrial {
                    duration_ms: Some(elapsed),
                    passed: false,
                    timed_out: false,
                });
            }
            _ => return Err(self.core.rejected(&command, self.phase)),
        }
        Ok(())
    }
}

impl AssessmentModule for CoordinationModule {
    fn id(&self) -> ModuleId {
        ModuleId::Coordination
    }

    fn poll(&mut self) -> ModuleStatus {
        if let Some(status) = self.core.early_exit() {
            return status;
        }
        let now = self.core.now_ms();
        self.settle(now);
        if self.phase == GaitPhase::Done {
            ModuleStatus::Complete
        } else {
            ModuleStatus::Running
        }
    }

    fn cancel(&mut self) {
        self.countdown.cancel();
    }

    fn finalize(&mut self) -> Result<ModuleResult, AssessError> {
        if self.phase != GaitPhase::Done {
            self.core.ensure_open()?;
            return Err(AssessError::transition("coordination finalized before completion"));
        }
        self.core.begin_finalize()?;
        let best_ms = self
            .trials
            .iter()
            .filter(|t| t.passed)
            .filter_map(|t| t.duration_ms)
            .min();
        Ok(ModuleResult::Coordination(CoordinationResult {
            trials: self.trials.clone(),
            best_ms,
            completed_at: self.core.wall_now(),
        }))
    }
}
