#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and vocabulary parsing for the assessment engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every clinical parameter (timer lengths, thresholds, score maxima, digit
//!   and word lists, command vocabularies) lives here as data so it can be
//!   tuned without touching the state machines.
//! - Vocabulary alias CSV loader enforces headers and appends aliases after the
//!   TOML-declared ones, preserving declaration order.
use serde::Deserialize;

/// Identifiers of the clinical sub-tests, as spelled in config files.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKey {
    Orientation,
    ImmediateRecall,
    DigitSpan,
    MonthsReverse,
    Balance,
    Coordination,
    SmoothPursuit,
    DelayedRecall,
}

impl ModuleKey {
    pub const ALL: [ModuleKey; 8] = [
        ModuleKey::Orientation,
        ModuleKey::ImmediateRecall,
        ModuleKey::DigitSpan,
        ModuleKey::MonthsReverse,
        ModuleKey::Balance,
        ModuleKey::Coordination,
        ModuleKey::SmoothPursuit,
        ModuleKey::DelayedRecall,
    ];
}

/// Command words a vocabulary alias can map to.
///
/// `SelectByName` and free answers are not listed: they are produced by the
/// router's matching policy rather than by a literal alias.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandKey {
    Next,
    Previous,
    Select,
    Start,
    Stop,
    Pause,
    Resume,
    AddError,
    UndoError,
    MarkCorrect,
    MarkIncorrect,
    Complete,
    Skip,
    Exit,
}

/// Which vocabulary table a CSV row extends.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VocabScope {
    Common,
    Orientation,
    ImmediateRecall,
    DigitSpan,
    MonthsReverse,
    Balance,
    Coordination,
    SmoothPursuit,
    DelayedRecall,
}

impl From<ModuleKey> for VocabScope {
    fn from(k: ModuleKey) -> Self {
        match k {
            ModuleKey::Orientation => VocabScope::Orientation,
            ModuleKey::ImmediateRecall => VocabScope::ImmediateRecall,
            ModuleKey::DigitSpan => VocabScope::DigitSpan,
            ModuleKey::MonthsReverse => VocabScope::MonthsReverse,
            ModuleKey::Balance => VocabScope::Balance,
            ModuleKey::Coordination => VocabScope::Coordination,
            ModuleKey::SmoothPursuit => VocabScope::SmoothPursuit,
            ModuleKey::DelayedRecall => VocabScope::DelayedRecall,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionCfg {
    pub baseline: Vec<ModuleKey>,
    pub concussion: Vec<ModuleKey>,
    pub post_exercise: Vec<ModuleKey>,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            baseline: ModuleKey::ALL.to_vec(),
            concussion: ModuleKey::ALL.to_vec(),
            post_exercise: vec![
                ModuleKey::Orientation,
                ModuleKey::DigitSpan,
                ModuleKey::MonthsReverse,
                ModuleKey::Balance,
                ModuleKey::SmoothPursuit,
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimersCfg {
    /// Length of one balance stance (ms).
    pub stance_ms: u64,
    /// Pacing between spoken digits while a digit string is presented (ms).
    pub digit_interval_ms: u64,
    /// Response window after a digit string (ms).
    pub digit_response_ms: u64,
    /// Pacing between words while a recall list is presented (ms).
    pub word_interval_ms: u64,
    /// Response window for a recall trial (ms).
    pub recall_response_ms: u64,
    /// Minimum wait between immediate and delayed recall (ms).
    pub retention_gate_ms: u64,
    /// Response window for months in reverse (ms).
    pub months_response_ms: u64,
    /// Length of one smooth-pursuit sweep per axis (ms).
    pub pursuit_segment_ms: u64,
    /// Cap on a single tandem-gait trial (ms).
    pub coordination_trial_ms: u64,
}

impl Default for TimersCfg {
    fn default() -> Self {
        Self {
            stance_ms: 20_000,
            digit_interval_ms: 1_000,
            digit_response_ms: 10_000,
            word_interval_ms: 1_000,
            recall_response_ms: 30_000,
            retention_gate_ms: 300_000,
            months_response_ms: 30_000,
            pursuit_segment_ms: 10_000,
            coordination_trial_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SwayCfg {
    /// Rolling window (samples) for RMS displacement.
    pub window: usize,
    /// Upper bounds (metres) of the minimal, moderate and significant bands.
    /// Anything at or above the last bound is "high". Must be strictly increasing.
    pub bands_m: Vec<f64>,
}

impl Default for SwayCfg {
    fn default() -> Self {
        Self {
            window: 90,
            bands_m: vec![0.01, 0.025, 0.05],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HeadMotionCfg {
    /// Below this angular deviation (degrees) the head counts as still.
    pub warn_deg: f64,
    /// At or above this deviation a motion event is counted (once per excursion).
    pub event_deg: f64,
}

impl Default for HeadMotionCfg {
    fn default() -> Self {
        Self {
            warn_deg: 5.0,
            event_deg: 8.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RecallMax {
    pub list_size: usize,
    pub max: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringCfg {
    /// Inclusive ceiling on errors per balance stance.
    pub balance_max_errors: u32,
    /// Number of list exposures in immediate recall.
    pub recall_trials: u32,
    /// Per-trial score ceilings keyed by word-list size.
    pub recall_max: Vec<RecallMax>,
    /// Tokens ignored when scoring recall and months answers.
    pub filler_tokens: Vec<String>,
    /// Tokens that close a free-answer response window.
    pub terminator_tokens: Vec<String>,
    /// Consecutive digit-string failures that stop the digit-span test.
    pub digit_stop_after_failures: u32,
    /// Number of tandem-gait trials.
    pub coordination_trials: u32,
}

impl Default for ScoringCfg {
    fn default() -> Self {
        Self {
            balance_max_errors: 10,
            recall_trials: 3,
            recall_max: vec![
                RecallMax {
                    list_size: 5,
                    max: 5,
                },
                RecallMax {
                    list_size: 10,
                    max: 10,
                },
            ],
            filler_tokens: ["done", "um", "uh", "er", "and"]
                .into_iter()
                .map(String::from)
                .collect(),
            terminator_tokens: ["done", "finished"].into_iter().map(String::from).collect(),
            digit_stop_after_failures: 2,
            coordination_trials: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RecognitionCfg {
    /// Transcripts reporting a confidence below this are recognition failures.
    pub min_confidence: f32,
    /// Consecutive failed or unmatched transcripts before the manual-input prompt.
    pub fallback_after: u32,
}

impl Default for RecognitionCfg {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            fallback_after: 2,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OrientationCfg {
    /// Accepted distance (minutes) between the stated and the actual time of day.
    pub time_tolerance_min: u32,
}

impl Default for OrientationCfg {
    fn default() -> Self {
        Self {
            time_tolerance_min: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProtocolCfg {
    /// Digit strings, two per length, shortest first.
    pub digit_lists: Vec<Vec<u8>>,
    /// Candidate recall word lists (5 or 10 words each).
    pub word_lists: Vec<Vec<String>>,
    /// Word list used for new sessions.
    pub word_list_index: usize,
    /// Balance stance names in the order they are run.
    pub stances: Vec<String>,
}

impl Default for ProtocolCfg {
    fn default() -> Self {
        let words = |ws: &[&str]| ws.iter().map(|w| (*w).to_string()).collect::<Vec<_>>();
        Self {
            digit_lists: vec![
                vec![4, 9, 3],
                vec![6, 2, 9],
                vec![3, 8, 1, 4],
                vec![3, 2, 7, 9],
                vec![6, 2, 9, 7, 1],
                vec![1, 5, 2, 8, 6],
                vec![7, 1, 8, 4, 6, 2],
                vec![5, 3, 9, 1, 4, 8],
            ],
            word_lists: vec![
                words(&["finger", "penny", "blanket", "lemon", "insect"]),
                words(&["candle", "paper", "sugar", "sandwich", "wagon"]),
                words(&["baby", "monkey", "perfume", "sunset", "iron"]),
                words(&[
                    "finger", "penny", "blanket", "lemon", "insect", "candle", "paper", "sugar",
                    "sandwich", "wagon",
                ]),
            ],
            word_list_index: 0,
            stances: words(&["double_leg", "single_leg", "tandem"]),
        }
    }
}

/// One vocabulary row: every alias maps to the same command.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct VocabEntry {
    pub command: CommandKey,
    pub aliases: Vec<String>,
}

fn entry(command: CommandKey, aliases: &[&str]) -> VocabEntry {
    VocabEntry {
        command,
        aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
    }
}

/// Per-module command tables. A module's effective table is its own entries
/// followed by `common`, so module aliases win over shared ones.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VocabularyCfg {
    pub common: Vec<VocabEntry>,
    pub orientation: Vec<VocabEntry>,
    pub immediate_recall: Vec<VocabEntry>,
    pub digit_span: Vec<VocabEntry>,
    pub months_reverse: Vec<VocabEntry>,
    pub balance: Vec<VocabEntry>,
    pub coordination: Vec<VocabEntry>,
    pub smooth_pursuit: Vec<VocabEntry>,
    pub delayed_recall: Vec<VocabEntry>,
}

impl Default for VocabularyCfg {
    fn default() -> Self {
        use CommandKey::*;
        let start = || entry(Start, &["start", "begin", "ready"]);
        Self {
            common: vec![
                entry(Skip, &["skip", "skip test", "skip this"]),
                entry(Exit, &["exit", "quit", "exit test"]),
            ],
            orientation: vec![
                entry(Next, &["next", "next question"]),
                entry(Previous, &["previous", "previous question", "back"]),
                entry(Complete, &["finish", "complete"]),
            ],
            immediate_recall: vec![
                start(),
                entry(Complete, &["done", "finished", "i'm done"]),
                entry(Next, &["next", "next trial"]),
            ],
            digit_span: vec![start(), entry(Next, &["next", "next one"])],
            months_reverse: vec![start(), entry(Complete, &["done", "finished"])],
            balance: vec![
                entry(Start, &["start", "begin", "go"]),
                entry(Pause, &["pause", "hold"]),
                entry(Resume, &["resume", "continue"]),
                entry(Stop, &["stop", "end stance"]),
                entry(AddError, &["error", "add error", "mistake", "plus one"]),
                entry(UndoError, &["undo", "remove error", "minus one"]),
                entry(Next, &["next", "next stance"]),
            ],
            coordination: vec![
                entry(Start, &["start", "go"]),
                entry(Stop, &["stop", "finished", "done"]),
                entry(MarkCorrect, &["correct", "good"]),
                entry(MarkIncorrect, &["fail", "incorrect", "error"]),
                entry(Next, &["next", "next trial"]),
            ],
            smooth_pursuit: vec![
                entry(Start, &["start", "begin", "follow"]),
                entry(Stop, &["stop"]),
                entry(Next, &["next", "next axis"]),
            ],
            delayed_recall: vec![start(), entry(Complete, &["done", "finished", "i'm done"])],
        }
    }
}

impl VocabularyCfg {
    pub fn scope(&self, scope: VocabScope) -> &Vec<VocabEntry> {
        match scope {
            VocabScope::Common => &self.common,
            VocabScope::Orientation => &self.orientation,
            VocabScope::ImmediateRecall => &self.immediate_recall,
            VocabScope::DigitSpan => &self.digit_span,
            VocabScope::MonthsReverse => &self.months_reverse,
            VocabScope::Balance => &self.balance,
            VocabScope::Coordination => &self.coordination,
            VocabScope::SmoothPursuit => &self.smooth_pursuit,
            VocabScope::DelayedRecall => &self.delayed_recall,
        }
    }

    pub fn scope_mut(&mut self, scope: VocabScope) -> &mut Vec<VocabEntry> {
        match scope {
            VocabScope::Common => &mut self.common,
            VocabScope::Orientation => &mut self.orientation,
            VocabScope::ImmediateRecall => &mut self.immediate_recall,
            VocabScope::DigitSpan => &mut self.digit_span,
            VocabScope::MonthsReverse => &mut self.months_reverse,
            VocabScope::Balance => &mut self.balance,
            VocabScope::Coordination => &mut self.coordination,
            VocabScope::SmoothPursuit => &mut self.smooth_pursuit,
            VocabScope::DelayedRecall => &mut self.delayed_recall,
        }
    }

    /// Append CSV-sourced aliases. A row whose command already has an entry in
    /// the scope extends that entry; otherwise a new entry goes at the end.
    pub fn apply_rows(&mut self, rows: &[VocabularyRow]) {
        for row in rows {
            let table = self.scope_mut(row.module);
            match table.iter_mut().find(|e| e.command == row.command) {
                Some(e) => e.aliases.push(row.alias.clone()),
                None => table.push(VocabEntry {
                    command: row.command,
                    aliases: vec![row.alias.clone()],
                }),
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplerCfg {
    /// Pose sampling rate in Hz.
    pub sample_rate_hz: u32,
    /// Bounded queue depth between the pose thread and the session thread.
    pub queue_capacity: usize,
    /// Max wait per pose read (ms).
    pub read_timeout_ms: u64,
    /// Tracking counts as lost when no sample has arrived for this long (ms).
    pub stall_ms: u64,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 30,
            queue_capacity: 32,
            read_timeout_ms: 100,
            stall_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub session: SessionCfg,
    pub timers: TimersCfg,
    pub sway: SwayCfg,
    pub head_motion: HeadMotionCfg,
    pub scoring: ScoringCfg,
    pub recognition: RecognitionCfg,
    pub orientation: OrientationCfg,
    pub protocol: ProtocolCfg,
    pub vocabulary: VocabularyCfg,
    pub sampler: SamplerCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Vocabulary alias CSV schema.
///
/// Expected headers:
/// module,command,alias
///
/// Example:
/// module,command,alias
/// balance,add_error,wobble
/// common,exit,stop everything
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct VocabularyRow {
    pub module: VocabScope,
    pub command: CommandKey,
    pub alias: String,
}

pub fn load_vocabulary_csv(path: &std::path::Path) -> eyre::Result<Vec<VocabularyRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open vocabulary CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["module", "command", "alias"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "vocabulary CSV must have headers 'module,command,alias', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<VocabularyRow>().enumerate() {
        match rec {
            Ok(row) => {
                if row.alias.trim().is_empty() {
                    eyre::bail!("invalid CSV row {}: alias must not be empty", idx + 2);
                }
                rows.push(row);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}

fn validate_order(name: &str, order: &[ModuleKey]) -> eyre::Result<()> {
    if order.is_empty() {
        eyre::bail!("session.{name} must list at least one module");
    }
    for (i, m) in order.iter().enumerate() {
        if order[..i].contains(m) {
            eyre::bail!("session.{name} lists {m:?} more than once");
        }
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Session orders
        validate_order("baseline", &self.session.baseline)?;
        validate_order("concussion", &self.session.concussion)?;
        validate_order("post_exercise", &self.session.post_exercise)?;

        // Timers
        let t = &self.timers;
        for (name, v) in [
            ("stance_ms", t.stance_ms),
            ("digit_interval_ms", t.digit_interval_ms),
            ("digit_response_ms", t.digit_response_ms),
            ("word_interval_ms", t.word_interval_ms),
            ("recall_response_ms", t.recall_response_ms),
            ("months_response_ms", t.months_response_ms),
            ("pursuit_segment_ms", t.pursuit_segment_ms),
            ("coordination_trial_ms", t.coordination_trial_ms),
        ] {
            if v == 0 {
                eyre::bail!("timers.{name} must be >= 1");
            }
        }
        if t.retention_gate_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("timers.retention_gate_ms is unreasonably large (>24h)");
        }

        // Sway
        if self.sway.window == 0 {
            eyre::bail!("sway.window must be >= 1");
        }
        if self.sway.bands_m.is_empty() {
            eyre::bail!("sway.bands_m must have at least one threshold");
        }
        if self
            .sway
            .bands_m
            .iter()
            .any(|b| !b.is_finite() || *b <= 0.0)
        {
            eyre::bail!("sway.bands_m thresholds must be finite and > 0");
        }
        if self.sway.bands_m.windows(2).any(|w| w[0] >= w[1]) {
            eyre::bail!("sway.bands_m must be strictly increasing");
        }

        // Head motion
        let hm = &self.head_motion;
        if !(hm.warn_deg.is_finite() && hm.warn_deg > 0.0) {
            eyre::bail!("head_motion.warn_deg must be > 0");
        }
        if !hm.event_deg.is_finite() || hm.event_deg < hm.warn_deg {
            eyre::bail!("head_motion.event_deg must be >= warn_deg");
        }
        if hm.event_deg > 180.0 {
            eyre::bail!("head_motion.event_deg must be <= 180");
        }

        // Scoring
        let s = &self.scoring;
        if s.balance_max_errors == 0 {
            eyre::bail!("scoring.balance_max_errors must be >= 1");
        }
        if s.recall_trials == 0 {
            eyre::bail!("scoring.recall_trials must be >= 1");
        }
        if s.digit_stop_after_failures == 0 {
            eyre::bail!("scoring.digit_stop_after_failures must be >= 1");
        }
        if s.coordination_trials == 0 {
            eyre::bail!("scoring.coordination_trials must be >= 1");
        }
        for rm in &s.recall_max {
            if rm.max as usize > rm.list_size {
                eyre::bail!(
                    "scoring.recall_max for list_size {} must not exceed the list size",
                    rm.list_size
                );
            }
        }

        // Recognition
        let r = &self.recognition;
        if !(0.0..=1.0).contains(&r.min_confidence) {
            eyre::bail!("recognition.min_confidence must be in [0.0, 1.0]");
        }
        if r.fallback_after == 0 {
            eyre::bail!("recognition.fallback_after must be >= 1");
        }

        // Orientation
        if self.orientation.time_tolerance_min > 12 * 60 {
            eyre::bail!("orientation.time_tolerance_min must be <= 720");
        }

        // Protocol
        let p = &self.protocol;
        if p.digit_lists.is_empty() {
            eyre::bail!("protocol.digit_lists must not be empty");
        }
        if p.digit_lists.len() % 2 != 0 {
            eyre::bail!("protocol.digit_lists must hold two strings per length");
        }
        for pair in p.digit_lists.chunks(2) {
            if pair[0].is_empty() || pair[0].len() != pair[1].len() {
                eyre::bail!("protocol.digit_lists pairs must be non-empty and of equal length");
            }
        }
        if p.digit_lists.iter().flatten().any(|d| *d > 9) {
            eyre::bail!("protocol.digit_lists entries must be digits 0-9");
        }
        if p.word_lists.is_empty() {
            eyre::bail!("protocol.word_lists must not be empty");
        }
        if p.word_list_index >= p.word_lists.len() {
            eyre::bail!("protocol.word_list_index must index into protocol.word_lists");
        }
        for list in &p.word_lists {
            if list.is_empty() {
                eyre::bail!("protocol.word_lists entries must not be empty");
            }
            if !s.recall_max.iter().any(|rm| rm.list_size == list.len()) {
                eyre::bail!(
                    "protocol.word_lists has a list of size {} with no scoring.recall_max entry",
                    list.len()
                );
            }
        }
        if p.stances.is_empty() {
            eyre::bail!("protocol.stances must not be empty");
        }

        // Vocabulary
        for key in ModuleKey::ALL {
            let own = self.vocabulary.scope(key.into());
            if own.is_empty() && self.vocabulary.common.is_empty() {
                eyre::bail!("vocabulary for {key:?} is empty");
            }
        }
        let all_scopes = std::iter::once(&self.vocabulary.common)
            .chain(ModuleKey::ALL.iter().map(|k| self.vocabulary.scope((*k).into())));
        for table in all_scopes {
            if table
                .iter()
                .any(|e| e.aliases.is_empty() || e.aliases.iter().any(|a| a.trim().is_empty()))
            {
                eyre::bail!("vocabulary entries must have non-empty aliases");
            }
        }

        // Sampler
        if self.sampler.sample_rate_hz == 0 {
            eyre::bail!("sampler.sample_rate_hz must be > 0");
        }
        if self.sampler.queue_capacity == 0 {
            eyre::bail!("sampler.queue_capacity must be >= 1");
        }
        if self.sampler.read_timeout_ms == 0 {
            eyre::bail!("sampler.read_timeout_ms must be >= 1");
        }
        if self.sampler.stall_ms == 0 {
            eyre::bail!("sampler.stall_ms must be >= 1");
        }

        Ok(())
    }
}
