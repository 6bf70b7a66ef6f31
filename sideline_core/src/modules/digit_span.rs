//! Digits backwards: paced presentation, timed spoken response, stop rule.

use super::result::{DigitSpanResult, DigitTrial};
use super::{AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult};
use crate::error::AssessError;
use crate::scoring::{StopRule, parse_digits, score_reversal};
use crate::status::ModuleStatus;
use crate::timer::Countdown;
use crate::util::pacing_ms;
use crate::voice::{Vocabulary, VoiceCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitPhase {
    /// Waiting for the examiner to present the next string.
    Ready,
    Presenting,
    AwaitingResponse,
    /// Last trial scored; waiting for the examiner to continue.
    Scored,
    Done,
}

pub struct DigitSpanModule {
    core: ModuleCore,
    /// Strings grouped by length; each group holds up to two strings.
    levels: Vec<Vec<Vec<u8>>>,
    level: usize,
    attempt: usize,
    phase: DigitPhase,
    interval_ms: u64,
    presenting_since: u64,
    response: Countdown,
    stop: StopRule,
    trials: Vec<DigitTrial>,
    passed_levels: u32,
    stopped_early: bool,
}

impl DigitSpanModule {
    pub fn new(
        core: ModuleCore,
        digit_lists: &[Vec<u8>],
        interval_ms: u64,
        response_ms: u64,
        stop_after: u32,
    ) -> Self {
        let levels: Vec<Vec<Vec<u8>>> = digit_lists.chunks(2).map(<[Vec<u8>]>::to_vec).collect();
        let phase = if levels.is_empty() {
            DigitPhase::Done
        } else {
            DigitPhase::Ready
        };
        Self {
            core,
            levels,
            level: 0,
            attempt: 0,
            phase,
            interval_ms,
            presenting_since: 0,
            response: Countdown::new(response_ms),
            stop: StopRule::new(stop_after),
            trials: Vec::new(),
            passed_levels: 0,
            stopped_early: false,
        }
    }

    pub fn phase(&self) -> DigitPhase {
        self.phase
    }

    fn current(&self) -> &[u8] {
        self.levels
            .get(self.level)
            .and_then(|l| l.get(self.attempt))
            .map_or(&[][..], Vec::as_slice)
    }

    fn presentation_ms(&self) -> u64 {
        pacing_ms(self.current().len(), self.interval_ms)
    }

    /// Digits shown so far in the current presentation, one per interval.
    pub fn visible_digits(&self) -> &[u8] {
        let digits = self.current();
        match self.phase {
            DigitPhase::Presenting => {
                let elapsed = self.core.now_ms().saturating_sub(self.presenting_since);
                let shown = (elapsed / self.interval_ms.max(1)) + 1;
                &digits[..usize::try_from(shown).unwrap_or(usize::MAX).min(digits.len())]
            }
            DigitPhase::AwaitingResponse => digits,
            _ => &[],
        }
    }

    fn present(&mut self, now: u64) {
        self.phase = DigitPhase::Presenting;
        self.presenting_since = now;
        tracing::info!(
            length = self.current().len(),
            attempt = self.attempt + 1,
            "digit string presented"
        );
    }

    fn settle(&mut self, now: u64) {
        if self.phase == DigitPhase::Presenting
            && now.saturating_sub(self.presenting_since) >= self.presentation_ms()
        {
            self.phase = DigitPhase::AwaitingResponse;
            self.response.start(now);
        }
        if self.phase == DigitPhase::AwaitingResponse && self.response.poll(now) {
            tracing::info!("digit response window elapsed");
            self.record(Vec::new(), true);
        }
    }

    fn record(&mut self, response: Vec<u8>, timed_out: bool) {
        self.response.cancel();
        let presented = self.current().to_vec();
        let outcome = score_reversal(&presented, &response);
        tracing::info!(
            length = presented.len(),
            pass = outcome.pass,
            first_mismatch = ?outcome.first_mismatch,
            timed_out,
            "digit trial scored"
        );
        self.trials.push(DigitTrial {
            presented,
            response,
            pass: outcome.pass,
            first_mismatch: outcome.first_mismatch,
            timed_out,
        });

        let stop = self.stop.record(outcome.pass);
        let level_len = self.levels.get(self.level).map_or(0, Vec::len);
        if outcome.pass {
            self.passed_levels += 1;
            self.level += 1;
            self.attempt = 0;
        } else if stop {
            self.stopped_early = true;
            self.phase = DigitPhase::Done;
            return;
        } else if self.attempt + 1 < level_len {
            self.attempt += 1;
        } else {
            self.level += 1;
            self.attempt = 0;
        }
        self.phase = if self.level >= self.levels.len() {
            DigitPhase::Done
        } else {
            DigitPhase::Scored
        };
    }
}

impl CommandReceiver for DigitSpanModule {
    fn vocabulary(&self) -> &Vocabulary {
        self.core.vocabulary()
    }

    fn accepts_answers(&self) -> bool {
        match self.phase {
            DigitPhase::AwaitingResponse => true,
            // presentation over but not yet polled
            DigitPhase::Presenting => {
                self.core.now_ms().saturating_sub(self.presenting_since) >= self.presentation_ms()
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

        match (&command, self.phase) {
            (
                VoiceCommand::Start | VoiceCommand::Next | VoiceCommand::Select,
                DigitPhase::Ready | DigitPhase::Scored,
            ) => self.present(now),
            (VoiceCommand::Answer(text), DigitPhase::AwaitingResponse) => {
                let digits = parse_digits(text);
                if digits.is_empty() {
                    return Err(AssessError::RecognitionFailure);
                }
                self.record(digits, false);
            }
            _ => return Err(self.core.rejected(&command, self.phase)),
        }
        Ok(())
    }
}

impl AssessmentModule for DigitSpanModule {
    fn id(&self) -> ModuleId {
        ModuleId::DigitSpan
    }

    fn poll(&mut self) -> ModuleStatus {
        if let Some(status) = self.core.early_exit() {
            return status;
        }
        let now = self.core.now_ms();
        self.settle(now);
        if self.phase == DigitPhase::Done {
            ModuleStatus::Complete
        } else {
            ModuleStatus::Running
        }
    }

    fn cancel(&mut self) {
        self.response.cancel();
    }

    fn finalize(&mut self) -> Result<ModuleResult, AssessError> {
        if self.phase != DigitPhase::Done {
            self.core.ensure_open()?;
            return Err(AssessError::transition("digit span finalized before completion"));
        }
        self.core.begin_finalize()?;
        Ok(ModuleResult::DigitSpan(DigitSpanResult {
            trials: self.trials.clone(),
            score: self.passed_levels,
            max: u32::try_from(self.levels.len()).unwrap_or(u32::MAX),
            stopped_early: self.stopped_early,
            completed_at: self.core.wall_now(),
        }))
    }
}
