use serde::{Deserialize, Serialize};

pub const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthsOutcome {
    /// 1 for a fully correct reverse recitation, else 0.
    pub score: u32,
    /// Index into the filtered response where it first diverged.
    pub first_mismatch: Option<usize>,
}

/// Lowercase month name for `month` in `1..=12`.
pub fn month_name(month: u32) -> Option<&'static str> {
    let idx = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTHS.get(idx).copied()
}

/// Score a months-in-reverse recitation.
///
/// Fillers are dropped; what remains must be exactly December..January.
pub fn score_months_reverse(tokens: &[String], fillers: &[String]) -> MonthsOutcome {
    let said: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|t| !fillers.iter().any(|f| f == t))
        .collect();
    let first_mismatch = MONTHS
        .iter()
        .rev()
        .zip(&said)
        .position(|(want, got)| want != got)
        .or_else(|| (said.len() != MONTHS.len()).then(|| said.len().min(MONTHS.len())));
    MonthsOutcome {
        score: u32::from(first_mismatch.is_none()),
        first_mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reversed() -> Vec<String> {
        MONTHS.iter().rev().map(|m| (*m).to_string()).collect()
    }

    #[test]
    fn full_reverse_scores_one() {
        let mut said = reversed();
        said.insert(3, "um".into());
        let out = score_months_reverse(&said, &["um".to_string()]);
        assert_eq!(out.score, 1);
    }

    #[test]
    fn swapped_pair_scores_zero() {
        let mut said = reversed();
        said.swap(4, 5);
        let out = score_months_reverse(&said, &[]);
        assert_eq!(out.score, 0);
        assert_eq!(out.first_mismatch, Some(4));
    }

    #[test]
    fn missing_month_scores_zero() {
        let mut said = reversed();
        said.pop();
        assert_eq!(score_months_reverse(&said, &[]).first_mismatch, Some(11));
    }
}
