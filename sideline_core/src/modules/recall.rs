//! Word recall, immediate and delayed.
//!
//! Immediate recall presents the session's word list and collects several
//! response trials. Delayed recall collects a single trial without
//! re-presenting the list, and refuses to start until the retention interval
//! since immediate recall has elapsed.

use std::time::Instant;

use super::result::{RecallResult, RecallTrial};
use super::{AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult};
use crate::config::ScoringCfg;
use crate::error::AssessError;
use crate::scoring::score_recall;
use crate::status::ModuleStatus;
use crate::timer::Countdown;
use crate::util::{duration_ms, pacing_ms};
use crate::voice::{Vocabulary, VoiceCommand, tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallPhase {
    Ready,
    Presenting,
    AwaitingResponse,
    BetweenTrials,
    Done,
}

#[derive(Debug, Clone, Copy)]
struct RetentionGate {
    learned_at: Instant,
    gate_ms: u64,
}

pub struct RecallModule {
    core: ModuleCore,
    words: Vec<String>,
    trials_total: usize,
    phase: RecallPhase,
    word_interval_ms: u64,
    presenting_since: u64,
    response: Countdown,
    heard: Vec<String>,
    trials: Vec<RecallTrial>,
    cap: u32,
    scoring: ScoringCfg,
    gate: Option<RetentionGate>,
}

impl RecallModule {
    pub fn immediate(
        core: ModuleCore,
        words: Vec<String>,
        word_interval_ms: u64,
        response_ms: u64,
        scoring: &ScoringCfg,
    ) -> Self {
        let trials_total = usize::try_from(scoring.recall_trials).unwrap_or(1);
        Self::build(core, words, trials_total, word_interval_ms, response_ms, scoring, None)
    }

    /// `learned_at` is when immediate recall finished. Without it the gate is
    /// open.
    pub fn delayed(
        core: ModuleCore,
        words: Vec<String>,
        learned_at: Option<Instant>,
        gate_ms: u64,
        response_ms: u64,
        scoring: &ScoringCfg,
    ) -> Self {
        let gate = learned_at.map(|learned_at| RetentionGate { learned_at, gate_ms });
        Self::build(core, words, 1, 0, response_ms, scoring, gate)
    }

    fn build(
        core: ModuleCore,
        words: Vec<String>,
        trials_total: usize,
        word_interval_ms: u64,
        response_ms: u64,
        scoring: &ScoringCfg,
        gate: Option<RetentionGate>,
    ) -> Self {
        let cap = scoring.recall_cap(words.len());
        Self {
            core,
            words,
            trials_total: trials_total.max(1),
            phase: RecallPhase::Ready,
            word_interval_ms,
            presenting_since: 0,
            response: Countdown::new(response_ms),
            heard: Vec::new(),
            trials: Vec::new(),
            cap,
            scoring: scoring.clone(),
            gate,
        }
    }

    pub fn phase(&self) -> RecallPhase {
        self.phase
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    fn is_delayed(&self) -> bool {
        self.core.id() == ModuleId::DelayedRecall
    }

    /// Milliseconds until delayed recall may start; zero once open.
    pub fn gate_remaining_ms(&self) -> u64 {
        self.gate.map_or(0, |g| {
            let waited = duration_ms(self.core.now().saturating_duration_since(g.learned_at));
            g.gate_ms.saturating_sub(waited)
        })
    }

    fn begin_trial(&mut self, now: u64) -> Result<(), AssessError> {
        self.heard.clear();
        if self.is_delayed() {
            let remaining_ms = self.gate_remaining_ms();
            if remaining_ms > 0 {
                return Err(AssessError::RetentionGate { remaining_ms });
            }
            self.open_response(now);
        } else {
            self.phase = RecallPhase::Presenting;
            self.presenting_since = now;
            tracing::info!(trial = self.trials.len() + 1, "word list presented");
        }
        Ok(())
    }

    fn open_response(&mut self, now: u64) {
        self.phase = RecallPhase::AwaitingResponse;
        self.response.start(now);
    }

    fn settle(&mut self, now: u64) {
        let presentation_ms = pacing_ms(self.words.len(), self.word_interval_ms);
        if self.phase == RecallPhase::Presenting
            && now.saturating_sub(self.presenting_since) >= presentation_ms
        {
            self.open_response(now);
        }
        if self.phase == RecallPhase::AwaitingResponse && self.response.poll(now) {
            tracing::info!("recall response window elapsed");
            self.close_trial(true);
        }
    }

    fn close_trial(&mut self, timed_out: bool) {
        self.response.cancel();
        let said: Vec<String> = self
            .heard
            .iter()
            .filter(|t| !self.scoring.is_terminator(t))
            .cloned()
            .collect();
        let outcome = score_recall(&self.words, &said, &self.scoring.filler_tokens, self.cap);
        tracing::info!(
            module = %self.core.id(),
            trial = self.trials.len() + 1,
            score = outcome.score,
            timed_out,
            "recall trial scored"
        );
        self.trials.push(RecallTrial {
            responses: std::mem::take(&mut self.heard),
            recalled: outcome.recalled,
            score: outcome.score,
            timed_out,
        });
        self.phase = if self.trials.len() >= self.trials_total {
            RecallPhase::Done
        } else {
            RecallPhase::BetweenTrials
        };
    }
}

impl CommandReceiver for RecallModule {
    fn vocabulary(&self) -> &Vocabulary {
        self.core.vocabulary()
    }

    fn accepts_answers(&self) -> bool {
        match self.phase {
            RecallPhase::AwaitingResponse => true,
            RecallPhase::Presenting => {
                let presentation_ms = pacing_ms(self.words.len(), self.word_interval_ms);
                self.core.now_ms().saturating_sub(self.presenting_since) >= presentation_ms
            }
            _ => false,
        }
    }

    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError> {
        self.core.ensure_open()?;
        if self.core.handle_common(&command) {
            self.response.cancel();
            return Ok(());
        }
        let now = self.core.now_ms();
        self.settle(now);

        use RecallPhase::{AwaitingResponse, BetweenTrials, Ready};
        match (&command, self.phase) {
            (VoiceCommand::Start | VoiceCommand::Select, Ready | BetweenTrials)
            | (VoiceCommand::Next, BetweenTrials) => self.begin_trial(now)?,
            (VoiceCommand::Answer(text), AwaitingResponse) => {
                let said = tokens(text);
                let closing = said.iter().any(|t| self.scoring.is_terminator(t));
                self.heard.extend(said);
                if closing {
                    self.close_trial(false);
                }
            }
            (VoiceCommand::Complete | VoiceCommand::Next, AwaitingResponse) => {
                self.close_trial(false);
            }
            _ => return Err(self.core.rejected(&command, self.phase)),
        }
        Ok(())
    }
}

impl AssessmentModule for RecallModule {
    fn id(&self) -> ModuleId {
        self.core.id()
    }

    fn poll(&mut self) -> ModuleStatus {
        if let Some(status) = self.core.early_exit() {
            return status;
        }
        let now = self.core.now_ms();
        self.settle(now);
        if self.phase == RecallPhase::Done {
            ModuleStatus::Complete
        } else {
            ModuleStatus::Running
        }
    }

    fn cancel(&mut self) {
        self.response.cancel();
    }

    fn finalize(&mut self) -> Result<ModuleResult, AssessError> {
        if self.phase != RecallPhase::Done {
            self.core.ensure_open()?;
            return Err(AssessError::transition("recall finalized before completion"));
        }
        self.core.begin_finalize()?;
        let trials_total = u32::try_from(self.trials_total).unwrap_or(u32::MAX);
        let result = RecallResult {
            words: self.words.clone(),
            trials: self.trials.clone(),
            score: self.trials.iter().map(|t| t.score).sum(),
            max: self.cap.min(u32::try_from(self.words.len()).unwrap_or(u32::MAX)) * trials_total,
            completed_at: self.core.wall_now(),
        };
        Ok(if self.is_delayed() {
            ModuleResult::DelayedRecall(result)
        } else {
            ModuleResult::ImmediateRecall(result)
        })
    }
}
