use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDateTime, Utc};

use super::balance::BalanceModule;
use super::coordination::CoordinationModule;
use super::digit_span::DigitSpanModule;
use super::months_reverse::MonthsReverseModule;
use super::orientation::OrientationModule;
use super::recall::RecallModule;
use super::smooth_pursuit::SmoothPursuitModule;
use super::{HostedModule, ModuleCore, ModuleId, SharedClock};
use crate::config::AssessCfg;
use crate::scoring::standard_questions;

/// Per-activation inputs that come from the session rather than config.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Word list fixed for the session.
    pub word_list: Vec<String>,
    /// When immediate recall finished, for the delayed-recall gate.
    pub learned_at: Option<Instant>,
    /// Wall-clock time of activation; result timestamps derive from it.
    pub wall_origin: DateTime<Utc>,
    /// Local date and time the orientation questions are answered against.
    pub local_now: NaiveDateTime,
}

/// Builds configured module instances.
pub struct ModuleFactory {
    cfg: Arc<AssessCfg>,
    clock: SharedClock,
}

impl ModuleFactory {
    pub fn new(cfg: Arc<AssessCfg>, clock: SharedClock) -> Self {
        Self { cfg, clock }
    }

    fn core(&self, id: ModuleId, ctx: &ModuleContext) -> ModuleCore {
        ModuleCore::new(id, self.clock.clone(), ctx.wall_origin, self.cfg.vocabulary(id))
    }

    pub fn build(&self, id: ModuleId, ctx: &ModuleContext) -> HostedModule {
        let cfg = &self.cfg;
        let t = &cfg.timers;
        let core = self.core(id, ctx);
        match id {
            ModuleId::Orientation => HostedModule::new(OrientationModule::new(
                core,
                standard_questions(ctx.local_now),
                cfg.orientation.time_tolerance_min,
            )),
            ModuleId::ImmediateRecall => HostedModule::new(RecallModule::immediate(
                core,
                ctx.word_list.clone(),
                t.word_interval_ms,
                t.recall_response_ms,
                &cfg.scoring,
            )),
            ModuleId::DigitSpan => HostedModule::new(DigitSpanModule::new(
                core,
                &cfg.protocol.digit_lists,
                t.digit_interval_ms,
                t.digit_response_ms,
                cfg.scoring.digit_stop_after_failures,
            )),
            ModuleId::MonthsReverse => HostedModule::new(MonthsReverseModule::new(
                core,
                t.months_response_ms,
                &cfg.scoring,
            )),
            ModuleId::Balance => HostedModule::new(BalanceModule::new(
                core,
                cfg.protocol.stances.clone(),
                t.stance_ms,
                cfg.scoring.balance_max_errors,
                cfg.sway.clone(),
            )),
            ModuleId::Coordination => HostedModule::new(CoordinationModule::new(
                core,
                cfg.scoring.coordination_trials,
                t.coordination_trial_ms,
            )),
            ModuleId::SmoothPursuit => HostedModule::new(SmoothPursuitModule::new(
                core,
                t.pursuit_segment_ms,
                cfg.head_motion,
            )),
            ModuleId::DelayedRecall => HostedModule::new(RecallModule::delayed(
                core,
                ctx.word_list.clone(),
                ctx.learned_at,
                t.retention_gate_ms,
                t.recall_response_ms,
                &cfg.scoring,
            )),
        }
    }
}
