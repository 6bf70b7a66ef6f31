//! `From` implementations bridging `sideline_config` types to `sideline_core` types.

use std::collections::HashMap;

use sideline_config::{CommandKey, ModuleKey, VocabEntry};

use crate::config::{
    AssessCfg, HeadMotionCfg, OrientationCfg, ProtocolCfg, RecognitionCfg, SamplerCfg,
    ScoringCfg, SessionOrders, SwayCfg, TimerCfg,
};
use crate::modules::ModuleId;
use crate::voice::{CommandKind, Vocabulary};

// ── Identifiers ──────────────────────────────────────────────────────────────

impl From<ModuleKey> for ModuleId {
    fn from(k: ModuleKey) -> Self {
        match k {
            ModuleKey::Orientation => ModuleId::Orientation,
            ModuleKey::ImmediateRecall => ModuleId::ImmediateRecall,
            ModuleKey::DigitSpan => ModuleId::DigitSpan,
            ModuleKey::MonthsReverse => ModuleId::MonthsReverse,
            ModuleKey::Balance => ModuleId::Balance,
            ModuleKey::Coordination => ModuleId::Coordination,
            ModuleKey::SmoothPursuit => ModuleId::SmoothPursuit,
            ModuleKey::DelayedRecall => ModuleId::DelayedRecall,
        }
    }
}

impl From<CommandKey> for CommandKind {
    fn from(k: CommandKey) -> Self {
        match k {
            CommandKey::Next => CommandKind::Next,
            CommandKey::Previous => CommandKind::Previous,
            CommandKey::Select => CommandKind::Select,
            CommandKey::Start => CommandKind::Start,
            CommandKey::Stop => CommandKind::Stop,
            CommandKey::Pause => CommandKind::Pause,
            CommandKey::Resume => CommandKind::Resume,
            CommandKey::AddError => CommandKind::AddError,
            CommandKey::UndoError => CommandKind::UndoError,
            CommandKey::MarkCorrect => CommandKind::MarkCorrect,
            CommandKey::MarkIncorrect => CommandKind::MarkIncorrect,
            CommandKey::Complete => CommandKind::Complete,
            CommandKey::Skip => CommandKind::Skip,
            CommandKey::Exit => CommandKind::Exit,
        }
    }
}

// ── Timers ───────────────────────────────────────────────────────────────────

impl From<&sideline_config::TimersCfg> for TimerCfg {
    fn from(c: &sideline_config::TimersCfg) -> Self {
        Self {
            stance_ms: c.stance_ms,
            digit_interval_ms: c.digit_interval_ms,
            digit_response_ms: c.digit_response_ms,
            word_interval_ms: c.word_interval_ms,
            recall_response_ms: c.recall_response_ms,
            retention_gate_ms: c.retention_gate_ms,
            months_response_ms: c.months_response_ms,
            pursuit_segment_ms: c.pursuit_segment_ms,
            coordination_trial_ms: c.coordination_trial_ms,
        }
    }
}

// ── Sensor thresholds ────────────────────────────────────────────────────────

impl From<&sideline_config::SwayCfg> for SwayCfg {
    fn from(c: &sideline_config::SwayCfg) -> Self {
        Self {
            window: c.window.max(1),
            bands_m: c.bands_m.clone(),
        }
    }
}

impl From<&sideline_config::HeadMotionCfg> for HeadMotionCfg {
    fn from(c: &sideline_config::HeadMotionCfg) -> Self {
        Self {
            warn_deg: c.warn_deg,
            event_deg: c.event_deg.max(c.warn_deg),
        }
    }
}

impl From<&sideline_config::SamplerCfg> for SamplerCfg {
    fn from(c: &sideline_config::SamplerCfg) -> Self {
        Self {
            sample_rate_hz: c.sample_rate_hz,
            queue_capacity: c.queue_capacity.max(1),
            read_timeout_ms: c.read_timeout_ms,
            stall_ms: c.stall_ms,
        }
    }
}

// ── Scoring ──────────────────────────────────────────────────────────────────

fn lowered(tokens: &[String]) -> Vec<String> {
    tokens.iter().map(|t| t.trim().to_lowercase()).collect()
}

impl From<&sideline_config::ScoringCfg> for ScoringCfg {
    fn from(c: &sideline_config::ScoringCfg) -> Self {
        Self {
            balance_max_errors: c.balance_max_errors,
            recall_trials: c.recall_trials.max(1),
            recall_max: c.recall_max.iter().map(|r| (r.list_size, r.max)).collect(),
            filler_tokens: lowered(&c.filler_tokens),
            terminator_tokens: lowered(&c.terminator_tokens),
            digit_stop_after_failures: c.digit_stop_after_failures.max(1),
            coordination_trials: c.coordination_trials.max(1),
        }
    }
}

impl From<&sideline_config::RecognitionCfg> for RecognitionCfg {
    fn from(c: &sideline_config::RecognitionCfg) -> Self {
        Self {
            min_confidence: c.min_confidence,
            fallback_after: c.fallback_after.max(1),
        }
    }
}

impl From<&sideline_config::OrientationCfg> for OrientationCfg {
    fn from(c: &sideline_config::OrientationCfg) -> Self {
        Self {
            time_tolerance_min: c.time_tolerance_min,
        }
    }
}

impl From<&sideline_config::ProtocolCfg> for ProtocolCfg {
    fn from(c: &sideline_config::ProtocolCfg) -> Self {
        Self {
            digit_lists: c.digit_lists.clone(),
            word_lists: c
                .word_lists
                .iter()
                .map(|list| lowered(list))
                .collect(),
            word_list_index: c.word_list_index,
            stances: c.stances.clone(),
        }
    }
}

// ── Session orders ───────────────────────────────────────────────────────────

impl From<&sideline_config::SessionCfg> for SessionOrders {
    fn from(c: &sideline_config::SessionCfg) -> Self {
        let ids = |keys: &[ModuleKey]| keys.iter().map(|k| ModuleId::from(*k)).collect();
        Self {
            baseline: ids(&c.baseline),
            concussion: ids(&c.concussion),
            post_exercise: ids(&c.post_exercise),
        }
    }
}

// ── Vocabulary ───────────────────────────────────────────────────────────────

fn append_entries(vocab: &mut Vocabulary, entries: &[VocabEntry]) {
    for e in entries {
        vocab.push_aliases(e.command.into(), e.aliases.iter().map(String::as_str));
    }
}

/// Effective table per module: the module's own entries, then the common ones.
fn vocabularies(c: &sideline_config::VocabularyCfg) -> HashMap<ModuleId, Vocabulary> {
    ModuleKey::ALL
        .iter()
        .map(|key| {
            let mut vocab = Vocabulary::default();
            append_entries(&mut vocab, c.scope((*key).into()));
            append_entries(&mut vocab, &c.common);
            (ModuleId::from(*key), vocab)
        })
        .collect()
}

impl From<&sideline_config::Config> for AssessCfg {
    fn from(c: &sideline_config::Config) -> Self {
        Self {
            timers: (&c.timers).into(),
            sway: (&c.sway).into(),
            head_motion: (&c.head_motion).into(),
            scoring: (&c.scoring).into(),
            recognition: (&c.recognition).into(),
            orientation: (&c.orientation).into(),
            protocol: (&c.protocol).into(),
            sampler: (&c.sampler).into(),
            orders: (&c.session).into(),
            vocabularies: vocabularies(&c.vocabulary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_entries_precede_common_entries() {
        let cfg = AssessCfg::default();
        let balance = cfg.vocabulary(ModuleId::Balance);
        assert_eq!(balance.lookup("start"), Some(CommandKind::Start));
        assert_eq!(balance.lookup("exit"), Some(CommandKind::Exit));
        let first_common = balance
            .entries()
            .iter()
            .position(|e| e.kind == CommandKind::Skip)
            .expect("skip present");
        let last_module = balance
            .entries()
            .iter()
            .rposition(|e| e.kind == CommandKind::Next)
            .expect("next present");
        assert!(last_module < first_common);
    }

    #[test]
    fn every_module_gets_a_table_ending_in_common_aliases() {
        let file = sideline_config::VocabularyCfg::default();
        let tables = vocabularies(&file);
        assert_eq!(tables.len(), ModuleKey::ALL.len());
        for vocab in tables.values() {
            assert_eq!(vocab.lookup("exit"), Some(CommandKind::Exit));
        }
    }

    #[test]
    fn recall_cap_falls_back_to_list_size() {
        let mut scoring = ScoringCfg::default();
        scoring.recall_max.clear();
        assert_eq!(scoring.recall_cap(7), 7);
        assert_eq!(ScoringCfg::default().recall_cap(10), 10);
    }
}
