//! Balance: timed stances with an examiner-tallied error count and sway.

use sideline_traits::PoseSample;

use super::result::{BalanceResult, StanceResult};
use super::{AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult};
use crate::config::SwayCfg;
use crate::error::AssessError;
use crate::metrics::SwayTracker;
use crate::scoring::ErrorCounter;
use crate::status::ModuleStatus;
use crate::timer::Countdown;
use crate::voice::{Vocabulary, VoiceCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StancePhase {
    Ready,
    Running,
    Paused,
    Done,
}

pub struct BalanceModule {
    core: ModuleCore,
    stances: Vec<String>,
    current: usize,
    phase: StancePhase,
    stance_ms: u64,
    countdown: Countdown,
    errors: ErrorCounter,
    sway_cfg: SwayCfg,
    sway: SwayTracker,
    results: Vec<Option<StanceResult>>,
}

impl BalanceModule {
    pub fn new(
        core: ModuleCore,
        stances: Vec<String>,
        stance_ms: u64,
        max_errors: u32,
        sway_cfg: SwayCfg,
    ) -> Self {
        let results = vec![None; stances.len()];
        Self {
            core,
            stances,
            current: 0,
            phase: StancePhase::Ready,
            stance_ms,
            countdown: Countdown::new(stance_ms),
            errors: ErrorCounter::new(max_errors),
            sway: SwayTracker::new(sway_cfg.clone()),
            sway_cfg,
            results,
        }
    }

    pub fn phase(&self) -> StancePhase {
        self.phase
    }

    pub fn current_stance(&self) -> Option<&str> {
        self.stances.get(self.current).map(String::as_str)
    }

    pub fn errors(&self) -> u32 {
        self.errors.count()
    }

    pub fn remaining_ms(&self) -> u64 {
        self.countdown.remaining_ms(self.core.now_ms())
    }

    fn next_pending(&self) -> Option<usize> {
        self.results.iter().position(Option::is_none)
    }

    fn all_done(&self) -> bool {
        self.results.iter().all(Option::is_some)
    }

    fn begin(&mut self, now: u64) {
        self.countdown.start(now);
        self.phase = StancePhase::Running;
        tracing::info!(stance = self.current_stance().unwrap_or_default(), "stance start");
    }

    /// Move to stance `idx` with fresh counters.
    fn prepare(&mut self, idx: usize) {
        self.current = idx;
        self.phase = StancePhase::Ready;
        self.countdown = Countdown::new(self.stance_ms);
        self.errors.reset();
        self.sway = SwayTracker::new(self.sway_cfg.clone());
    }

    fn finish_stance(&mut self, now: u64, stopped_early: bool) {
        let held_ms = self.countdown.elapsed_ms(now);
        self.countdown.cancel();
        let Some(stance) = self.stances.get(self.current).cloned() else {
            return;
        };
        let sway = self.sway.finalize();
        tracing::info!(
            %stance,
            errors = self.errors.count(),
            held_ms,
            stopped_early,
            max_sway_m = sway.max_m,
            "stance complete"
        );
        if let Some(slot) = self.results.get_mut(self.current) {
            *slot = Some(StanceResult {
                stance,
                errors: self.errors.count(),
                held_ms,
                stopped_early,
                sway,
            });
        }
        self.phase = StancePhase::Done;
    }

    fn settle(&mut self, now: u64) {
        if self.phase == StancePhase::Running && self.countdown.poll(now) {
            self.finish_stance(now, false);
        }
    }
}

impl CommandReceiver for BalanceModule {
    fn vocabulary(&self) -> &Vocabulary {
        self.core.vocabulary()
    }

    fn names(&self) -> Vec<String> {
        self.stances.clone()
    }

    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError> {
        self.core.ensure_open()?;
        if self.core.handle_common(&command) {
            self.countdown.cancel();
            return Ok(());
        }
        let now = self.core.now_ms();
        self.settle(now);

        use StancePhase::{Done, Paused, Ready, Running};
        match (&command, self.phase) {
            (VoiceCommand::Start | VoiceCommand::Select, Ready) if !self.stances.is_empty() => {
                self.begin(now);
            }
            (VoiceCommand::Start | VoiceCommand::Next, Done) => {
                let Some(idx) = self.next_pending() else {
                    return Err(self.core.rejected(&command, "all stances done"));
                };
                self.prepare(idx);
                if command == VoiceCommand::Start {
                    self.begin(now);
                }
            }
            (VoiceCommand::SelectByName(name), Ready | Done) => {
                let idx = self
                    .stances
                    .iter()
                    .position(|s| s == name)
                    .filter(|i| self.results[*i].is_none())
                    .ok_or_else(|| self.core.rejected(&command, format!("stance {name} unavailable")))?;
                self.prepare(idx);
            }
            (VoiceCommand::Pause, Running) => {
                self.countdown.pause(now);
                self.phase = Paused;
            }
            (VoiceCommand::Resume | VoiceCommand::Start, Paused) => {
                self.countdown.resume(now);
                self.phase = Running;
            }
            (VoiceCommand::AddError, Running) => {
                let n = self.errors.increment();
                tracing::debug!(errors = n, "balance error added");
            }
            (VoiceCommand::UndoError, Running | Paused) => {
                let n = self.errors.undo();
                tracing::debug!(errors = n, "balance error removed");
            }
            (VoiceCommand::Stop, Running | Paused) => self.finish_stance(now, true),
            _ => return Err(self.core.rejected(&command, self.phase)),
        }
        Ok(())
    }
}

impl AssessmentModule for BalanceModule {
    fn id(&self) -> ModuleId {
        ModuleId::Balance
    }

    fn poll(&mut self) -> ModuleStatus {
        if let Some(status) = self.core.early_exit() {
            return status;
        }
        let now = self.core.now_ms();
        self.settle(now);
        if self.all_done() {
            ModuleStatus::Complete
        } else {
            ModuleStatus::Running
        }
    }

    fn on_pose(&mut self, sample: &PoseSample) {
        if self.phase == StancePhase::Running {
            self.sway.ingest(sample);
        }
    }

    fn on_tracking(&mut self, available: bool) {
        if !available && matches!(self.phase, StancePhase::Running | StancePhase::Paused) {
            self.sway.invalidate();
        }
    }

    fn cancel(&mut self) {
        self.countdown.cancel();
    }

    fn finalize(&mut self) -> Result<ModuleResult, AssessError> {
        if !self.all_done() {
            self.core.ensure_open()?;
            return Err(AssessError::transition("balance finalized before all stances ran"));
        }
        self.core.begin_finalize()?;
        let stances: Vec<StanceResult> = self.results.iter().flatten().cloned().collect();
        let total_errors = stances.iter().map(|s| s.errors).sum();
        let per_stance = self.errors.max();
        let max_errors = per_stance * u32::try_from(stances.len()).unwrap_or(u32::MAX);
        let peak_sway_m = stances
            .iter()
            .filter(|s| s.sway.valid && s.sway.samples > 0)
            .map(|s| s.sway.max_m)
            .reduce(f64::max);
        Ok(ModuleResult::Balance(BalanceResult {
            stances,
            total_errors,
            max_errors,
            peak_sway_m,
            completed_at: self.core.wall_now(),
        }))
    }
}
