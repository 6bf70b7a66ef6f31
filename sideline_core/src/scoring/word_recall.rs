use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallOutcome {
    /// Target words that were recalled, in list order.
    pub recalled: Vec<String>,
    pub score: u32,
}

/// Score a free-recall response against the target list.
///
/// Matching is case-insensitive and set-based: repeats count once, order is
/// ignored, filler tokens are discarded, and non-target words never count.
/// The score is capped at `min(cap, targets.len())`.
pub fn score_recall(
    targets: &[String],
    responses: &[String],
    fillers: &[String],
    cap: u32,
) -> RecallOutcome {
    let said: HashSet<String> = responses
        .iter()
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty() && !fillers.iter().any(|f| f == r))
        .collect();

    let mut seen = HashSet::new();
    let recalled: Vec<String> = targets
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| said.contains(t) && seen.insert(t.clone()))
        .collect();

    let ceiling = cap.min(u32::try_from(targets.len()).unwrap_or(u32::MAX));
    let score = u32::try_from(recalled.len())
        .unwrap_or(u32::MAX)
        .min(ceiling);
    RecallOutcome { recalled, score }
}
