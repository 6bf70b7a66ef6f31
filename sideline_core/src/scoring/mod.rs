//! Pure scoring functions.
//!
//! Nothing here touches clocks, timers or shared state; every function is a
//! deterministic map from recorded responses to a score.

pub mod balance;
pub mod digit_span;
pub mod months;
pub mod orientation;
pub mod word_recall;

pub use balance::ErrorCounter;
pub use digit_span::{DigitTrialOutcome, StopRule, parse_digits, score_reversal};
pub use months::{MONTHS, MonthsOutcome, month_name, score_months_reverse};
pub use orientation::{OrientationItem, OrientationQuestion, is_correct, standard_questions};
pub use word_recall::{RecallOutcome, score_recall};

use crate::config::{OrientationCfg, ScoringCfg};
use crate::voice::tokens;

/// Scoring rules bound to the configured clinical parameters.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    scoring: ScoringCfg,
    orientation: OrientationCfg,
}

impl ScoringEngine {
    pub fn new(scoring: ScoringCfg, orientation: OrientationCfg) -> Self {
        Self {
            scoring,
            orientation,
        }
    }

    pub fn cfg(&self) -> &ScoringCfg {
        &self.scoring
    }

    pub fn orientation(&self, question: &OrientationQuestion, response: &str) -> bool {
        is_correct(question, response, self.orientation.time_tolerance_min)
    }

    pub fn digit_trial(&self, presented: &[u8], response_text: &str) -> DigitTrialOutcome {
        score_reversal(presented, &parse_digits(response_text))
    }

    pub fn months_reverse(&self, response_text: &str) -> MonthsOutcome {
        let said = self.without_terminators(tokens(response_text));
        score_months_reverse(&said, &self.scoring.filler_tokens)
    }

    /// One recall trial. Terminator words are treated as fillers.
    pub fn recall_trial(&self, targets: &[String], response_text: &str) -> RecallOutcome {
        let said = self.without_terminators(tokens(response_text));
        let cap = self.scoring.recall_cap(targets.len());
        score_recall(targets, &said, &self.scoring.filler_tokens, cap)
    }

    pub fn balance_counter(&self) -> ErrorCounter {
        ErrorCounter::new(self.scoring.balance_max_errors)
    }

    fn without_terminators(&self, said: Vec<String>) -> Vec<String> {
        said.into_iter()
            .filter(|t| !self.scoring.is_terminator(t))
            .collect()
    }
}
