use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitTrialOutcome {
    pub pass: bool,
    /// Index of the first response digit that disagrees with the reversed
    /// sequence. `None` when the trial passed.
    pub first_mismatch: Option<usize>,
}

/// A trial passes iff `response` equals `presented` reversed, element-wise.
pub fn score_reversal(presented: &[u8], response: &[u8]) -> DigitTrialOutcome {
    let expected = presented.iter().rev();
    let first_mismatch = expected
        .zip(response)
        .position(|(want, got)| want != got)
        .or_else(|| (presented.len() != response.len()).then(|| presented.len().min(response.len())));
    DigitTrialOutcome {
        pass: first_mismatch.is_none(),
        first_mismatch,
    }
}

fn word_digit(word: &str) -> Option<u8> {
    Some(match word {
        "zero" | "oh" | "o" => 0,
        "one" | "won" => 1,
        "two" | "to" | "too" => 2,
        "three" => 3,
        "four" | "for" | "fore" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" | "ate" => 8,
        "nine" => 9,
        _ => return None,
    })
}

/// Extract spoken or typed digits from a transcript.
///
/// Accepts `"4 2 7"`, `"427"`, `"4-2-7"` and `"four two seven"`; anything else
/// in the text is ignored.
pub fn parse_digits(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for raw in text.split(|c: char| c.is_whitespace() || matches!(c, ',' | '-' | '.')) {
        let token = raw.trim().to_lowercase();
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            out.extend(token.bytes().map(|b| b - b'0'));
        } else if let Some(d) = word_digit(&token) {
            out.push(d);
        }
    }
    out
}

/// Consecutive-failure stop rule for the digit span sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopRule {
    limit: u32,
    consecutive: u32,
}

impl StopRule {
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            consecutive: 0,
        }
    }

    /// Record a trial outcome. Returns `true` once the rule fires.
    pub fn record(&mut self, pass: bool) -> bool {
        if pass {
            self.consecutive = 0;
        } else {
            self.consecutive += 1;
        }
        self.triggered()
    }

    pub fn triggered(&self) -> bool {
        self.consecutive >= self.limit
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_sequence_passes() {
        let out = score_reversal(&[7, 2, 4], &[4, 2, 7]);
        assert!(out.pass);
        assert_eq!(out.first_mismatch, None);
    }

    #[test]
    fn forward_sequence_fails_at_first_position() {
        let out = score_reversal(&[7, 2, 4], &[7, 2, 4]);
        assert!(!out.pass);
        assert_eq!(out.first_mismatch, Some(0));
    }

    #[test]
    fn short_response_fails_past_prefix() {
        let out = score_reversal(&[7, 2, 4], &[4, 2]);
        assert!(!out.pass);
        assert_eq!(out.first_mismatch, Some(2));
    }

    #[test]
    fn parses_words_and_numerals() {
        assert_eq!(parse_digits("four, two seven"), vec![4, 2, 7]);
        assert_eq!(parse_digits("427"), vec![4, 2, 7]);
        assert_eq!(parse_digits("um 4-2-7 done"), vec![4, 2, 7]);
    }

    #[test]
    fn stop_rule_resets_on_pass() {
        let mut rule = StopRule::new(2);
        assert!(!rule.record(false));
        assert!(!rule.record(true));
        assert!(!rule.record(false));
        assert!(rule.record(false));
    }
}
