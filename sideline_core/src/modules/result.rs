//! Immutable module results, one variant per module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ModuleId;
use crate::metrics::{FocusSegment, HeadMotionSummary, SwayMetrics};
use crate::scoring::OrientationItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum ModuleResult {
    Orientation(OrientationResult),
    ImmediateRecall(RecallResult),
    DigitSpan(DigitSpanResult),
    MonthsReverse(MonthsResult),
    Balance(BalanceResult),
    Coordination(CoordinationResult),
    SmoothPursuit(PursuitResult),
    DelayedRecall(RecallResult),
}

impl ModuleResult {
    pub fn module_id(&self) -> ModuleId {
        match self {
            ModuleResult::Orientation(_) => ModuleId::Orientation,
            ModuleResult::ImmediateRecall(_) => ModuleId::ImmediateRecall,
            ModuleResult::DigitSpan(_) => ModuleId::DigitSpan,
            ModuleResult::MonthsReverse(_) => ModuleId::MonthsReverse,
            ModuleResult::Balance(_) => ModuleId::Balance,
            ModuleResult::Coordination(_) => ModuleId::Coordination,
            ModuleResult::SmoothPursuit(_) => ModuleId::SmoothPursuit,
            ModuleResult::DelayedRecall(_) => ModuleId::DelayedRecall,
        }
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        match self {
            ModuleResult::Orientation(r) => r.completed_at,
            ModuleResult::ImmediateRecall(r) | ModuleResult::DelayedRecall(r) => r.completed_at,
            ModuleResult::DigitSpan(r) => r.completed_at,
            ModuleResult::MonthsReverse(r) => r.completed_at,
            ModuleResult::Balance(r) => r.completed_at,
            ModuleResult::Coordination(r) => r.completed_at,
            ModuleResult::SmoothPursuit(r) => r.completed_at,
        }
    }

    /// `(score, max)` for modules with a discrete score. Balance reports
    /// errors; pursuit and coordination have none.
    pub fn score(&self) -> Option<(u32, u32)> {
        match self {
            ModuleResult::Orientation(r) => Some((r.score, r.max)),
            ModuleResult::ImmediateRecall(r) | ModuleResult::DelayedRecall(r) => {
                Some((r.score, r.max))
            }
            ModuleResult::DigitSpan(r) => Some((r.score, r.max)),
            ModuleResult::MonthsReverse(r) => Some((r.score, 1)),
            ModuleResult::Balance(r) => Some((r.total_errors, r.max_errors)),
            ModuleResult::Coordination(_) | ModuleResult::SmoothPursuit(_) => None,
        }
    }
}

// ── Orientation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationAnswer {
    pub item: OrientationItem,
    pub expected: String,
    pub response: Option<String>,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationResult {
    pub answers: Vec<OrientationAnswer>,
    pub score: u32,
    pub max: u32,
    pub completed_at: DateTime<Utc>,
}

// ── Word recall ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallTrial {
    /// Raw tokens heard during the response window.
    pub responses: Vec<String>,
    pub recalled: Vec<String>,
    pub score: u32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallResult {
    pub words: Vec<String>,
    pub trials: Vec<RecallTrial>,
    pub score: u32,
    pub max: u32,
    pub completed_at: DateTime<Utc>,
}

// ── Digit span ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitTrial {
    pub presented: Vec<u8>,
    pub response: Vec<u8>,
    pub pass: bool,
    pub first_mismatch: Option<usize>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitSpanResult {
    pub trials: Vec<DigitTrial>,
    /// Number of lengths passed.
    pub score: u32,
    pub max: u32,
    pub stopped_early: bool,
    pub completed_at: DateTime<Utc>,
}

// ── Months in reverse ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthsResult {
    pub responses: Vec<String>,
    pub score: u32,
    pub first_mismatch: Option<usize>,
    pub timed_out: bool,
    pub completed_at: DateTime<Utc>,
}

// ── Balance ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanceResult {
    pub stance: String,
    pub errors: u32,
    /// Time the stance was actually held, pauses excluded.
    pub held_ms: u64,
    pub stopped_early: bool,
    pub sway: SwayMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResult {
    pub stances: Vec<StanceResult>,
    pub total_errors: u32,
    pub max_errors: u32,
    /// Largest valid-segment sway across stances; `None` if every segment was
    /// invalidated.
    pub peak_sway_m: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

// ── Coordination ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaitTrial {
    pub duration_ms: Option<u64>,
    pub passed: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationResult {
    pub trials: Vec<GaitTrial>,
    pub best_ms: Option<u64>,
    pub completed_at: DateTime<Utc>,
}

// ── Smooth pursuit ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PursuitSegment {
    pub focus: FocusSegment,
    pub head: HeadMotionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PursuitResult {
    pub segments: Vec<PursuitSegment>,
    /// Focused time over total time, valid segments only.
    pub focus_ratio: f64,
    pub focus_breaks: u32,
    pub head_motion_events: u32,
    pub completed_at: DateTime<Utc>,
}
