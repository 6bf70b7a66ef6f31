use super::result::MonthsResult;
use super::{AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult};
use crate::config::ScoringCfg;
use crate::error::AssessError;
use crate::scoring::score_months_reverse;
use crate::status::ModuleStatus;
use crate::timer::Countdown;
use crate::voice::{Vocabulary, VoiceCommand, tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthsPhase {
    Ready,
    AwaitingResponse,
    Done,
}

/// Months of the year in reverse order, scored all-or-nothing.
pub struct MonthsReverseModule {
    core: ModuleCore,
    phase: MonthsPhase,
    response: Countdown,
    heard: Vec<String>,
    scoring: ScoringCfg,
    outcome: Option<(u32, Option<usize>, bool)>,
}

impl MonthsReverseModule {
    pub fn new(core: ModuleCore, response_ms: u64, scoring: &ScoringCfg) -> Self {
        Self {
            core,
            phase: MonthsPhase::Ready,
            response: Countdown::new(response_ms),
            heard: Vec::new(),
            scoring: scoring.clone(),
            outcome: None,
        }
    }

    pub fn phase(&self) -> MonthsPhase {
        self.phase
    }

    fn close(&mut self, timed_out: bool) {
        self.response.cancel();
        let said: Vec<String> = self
            .heard
            .iter()
            .filter(|t| !self.scoring.is_terminator(t))
            .cloned()
            .collect();
        let out = score_months_reverse(&said, &self.scoring.filler_tokens);
        tracing::info!(score = out.score, first_mismatch = ?out.first_mismatch, timed_out, "months reverse scored");
        self.outcome = Some((out.score, out.first_mismatch, timed_out));
        self.phase = MonthsPhase::Done;
    }

    fn settle(&mut self, now: u64) {
        if self.phase == MonthsPhase::AwaitingResponse && self.response.poll(now) {
            self.close(true);
        }
    }
}

impl CommandReceiver for MonthsReverseModule {
    fn vocabulary(&self) -> &Vocabulary {
        self.core.vocabulary()
    }

    fn accepts_answers(&self) -> bool {
        self.phase == MonthsPhase::AwaitingResponse
    }

    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError> {
        self.core.ensure_open()?;
        if self.core.handle_common(&command) {
            self.response.cancel();
            return Ok(());
        }
        let now = self.core.now_ms();
        self.settle(now);

        match (&command, self.phase) {
            (VoiceCommand::Start | VoiceCommand::Select, MonthsPhase::Ready) => {
                self.phase = MonthsPhase::AwaitingResponse;
                self.response.start(now);
            }
            (VoiceCommand::Answer(text), MonthsPhase::AwaitingResponse) => {
                let said = tokens(text);
                let closing = said.iter().any(|t| self.scoring.is_terminator(t));
                self.heard.extend(said);
                if closing {
                    self.close(false);
                }
            }
            (VoiceCommand::Complete, MonthsPhase::AwaitingResponse) => self.close(false),
            _ => return Err(self.core.rejected(&command, self.phase)),
        }
        Ok(())
    }
}

impl AssessmentModule for MonthsReverseModule {
    fn id(&self) -> ModuleId {
        ModuleId::MonthsReverse
    }

    fn poll(&mut self) -> ModuleStatus {
        if let Some(status) = self.core.early_exit() {
            return status;
        }
        let now = self.core.now_ms();
        self.settle(now);
        if self.phase == MonthsPhase::Done {
            ModuleStatus::Complete
        } else {
            ModuleStatus::Running
        }
    }

    fn cancel(&mut self) {
        self.response.cancel();
    }

    fn finalize(&mut self) -> Result<ModuleResult, AssessError> {
        let Some((score, first_mismatch, timed_out)) = self.outcome else {
            self.core.ensure_open()?;
            return Err(AssessError::transition("months reverse finalized before completion"));
        };
        self.core.begin_finalize()?;
        Ok(ModuleResult::MonthsReverse(MonthsResult {
            responses: self.heard.clone(),
            score,
            first_mismatch,
            timed_out,
            completed_at: self.core.wall_now(),
        }))
    }
}
