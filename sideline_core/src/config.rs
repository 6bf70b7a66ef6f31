//! Configuration types for the assessment engine.
//!
//! These are the runtime configuration structs handed to modules, the router
//! and the orchestrator. They are separate from the TOML-deserialized config in
//! `sideline_config`; defaults are taken from that crate so the clinical
//! parameters have a single source.

use std::collections::HashMap;

use crate::modules::ModuleId;
use crate::session::SessionKind;
use crate::voice::Vocabulary;

/// Timer lengths, all in milliseconds.
#[derive(Debug, Clone)]
pub struct TimerCfg {
    pub stance_ms: u64,
    pub digit_interval_ms: u64,
    pub digit_response_ms: u64,
    pub word_interval_ms: u64,
    pub recall_response_ms: u64,
    pub retention_gate_ms: u64,
    pub months_response_ms: u64,
    pub pursuit_segment_ms: u64,
    pub coordination_trial_ms: u64,
}

impl Default for TimerCfg {
    fn default() -> Self {
        (&sideline_config::TimersCfg::default()).into()
    }
}

/// Sway aggregation parameters.
#[derive(Debug, Clone)]
pub struct SwayCfg {
    /// Rolling RMS window in samples (>= 1).
    pub window: usize,
    /// Ascending band upper bounds in metres.
    pub bands_m: Vec<f64>,
}

impl Default for SwayCfg {
    fn default() -> Self {
        (&sideline_config::SwayCfg::default()).into()
    }
}

/// Head-motion thresholds in degrees. `event_deg >= warn_deg`.
#[derive(Debug, Clone, Copy)]
pub struct HeadMotionCfg {
    pub warn_deg: f64,
    pub event_deg: f64,
}

impl Default for HeadMotionCfg {
    fn default() -> Self {
        (&sideline_config::HeadMotionCfg::default()).into()
    }
}

#[derive(Debug, Clone)]
pub struct ScoringCfg {
    pub balance_max_errors: u32,
    pub recall_trials: u32,
    /// `(list_size, max)` pairs.
    pub recall_max: Vec<(usize, u32)>,
    /// Lowercased tokens dropped before recall/months scoring.
    pub filler_tokens: Vec<String>,
    /// Lowercased tokens that close a response window.
    pub terminator_tokens: Vec<String>,
    pub digit_stop_after_failures: u32,
    pub coordination_trials: u32,
}

impl ScoringCfg {
    /// Per-trial ceiling for a word list of `list_size` words. Falls back to the
    /// list size when no explicit entry exists.
    pub fn recall_cap(&self, list_size: usize) -> u32 {
        self.recall_max
            .iter()
            .find(|(size, _)| *size == list_size)
            .map(|(_, max)| *max)
            .unwrap_or_else(|| u32::try_from(list_size).unwrap_or(u32::MAX))
    }

    pub fn is_filler(&self, token: &str) -> bool {
        self.filler_tokens.iter().any(|f| f == token)
    }

    pub fn is_terminator(&self, token: &str) -> bool {
        self.terminator_tokens.iter().any(|t| t == token)
    }
}

impl Default for ScoringCfg {
    fn default() -> Self {
        (&sideline_config::ScoringCfg::default()).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecognitionCfg {
    pub min_confidence: f32,
    pub fallback_after: u32,
}

impl Default for RecognitionCfg {
    fn default() -> Self {
        (&sideline_config::RecognitionCfg::default()).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrientationCfg {
    pub time_tolerance_min: u32,
}

impl Default for OrientationCfg {
    fn default() -> Self {
        (&sideline_config::OrientationCfg::default()).into()
    }
}

#[derive(Debug, Clone)]
pub struct ProtocolCfg {
    pub digit_lists: Vec<Vec<u8>>,
    pub word_lists: Vec<Vec<String>>,
    pub word_list_index: usize,
    pub stances: Vec<String>,
}

impl ProtocolCfg {
    /// Word list assigned to new sessions.
    pub fn session_word_list(&self) -> Vec<String> {
        self.word_lists
            .get(self.word_list_index)
            .or_else(|| self.word_lists.first())
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for ProtocolCfg {
    fn default() -> Self {
        (&sideline_config::ProtocolCfg::default()).into()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SamplerCfg {
    pub sample_rate_hz: u32,
    pub queue_capacity: usize,
    pub read_timeout_ms: u64,
    pub stall_ms: u64,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        (&sideline_config::SamplerCfg::default()).into()
    }
}

/// Canonical module order per session kind.
#[derive(Debug, Clone)]
pub struct SessionOrders {
    pub baseline: Vec<ModuleId>,
    pub concussion: Vec<ModuleId>,
    pub post_exercise: Vec<ModuleId>,
}

impl SessionOrders {
    pub fn for_kind(&self, kind: SessionKind) -> &[ModuleId] {
        match kind {
            SessionKind::Baseline => &self.baseline,
            SessionKind::Concussion => &self.concussion,
            SessionKind::PostExercise => &self.post_exercise,
        }
    }
}

impl Default for SessionOrders {
    fn default() -> Self {
        (&sideline_config::SessionCfg::default()).into()
    }
}

/// Everything the engine needs, resolved from a validated `sideline_config::Config`.
#[derive(Debug, Clone)]
pub struct AssessCfg {
    pub timers: TimerCfg,
    pub sway: SwayCfg,
    pub head_motion: HeadMotionCfg,
    pub scoring: ScoringCfg,
    pub recognition: RecognitionCfg,
    pub orientation: OrientationCfg,
    pub protocol: ProtocolCfg,
    pub sampler: SamplerCfg,
    pub orders: SessionOrders,
    /// Effective vocabulary per module (module entries, then common entries).
    pub vocabularies: HashMap<ModuleId, Vocabulary>,
}

impl AssessCfg {
    pub fn vocabulary(&self, id: ModuleId) -> Vocabulary {
        self.vocabularies.get(&id).cloned().unwrap_or_default()
    }
}

impl Default for AssessCfg {
    fn default() -> Self {
        (&sideline_config::Config::default()).into()
    }
}
