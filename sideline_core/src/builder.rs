//! Builder for `SessionDriver`.
//!
//! Every collaborator has a default (stock config, monotonic clock, local wall
//! time), so `try_build()` only fails when the supplied config cannot run a
//! session at all.

use std::sync::Arc;

use chrono::{DateTime, Local};
use sideline_traits::MonotonicClock;

use crate::config::AssessCfg;
use crate::driver::SessionDriver;
use crate::error::{BuildError, Result};
use crate::modules::SharedClock;
use crate::session::SessionObserver;

#[derive(Default)]
pub struct SessionDriverBuilder {
    cfg: Option<Arc<AssessCfg>>,
    clock: Option<SharedClock>,
    wall_anchor: Option<DateTime<Local>>,
    observers: Vec<Box<dyn SessionObserver>>,
}

fn validate(cfg: &AssessCfg) -> Result<()> {
    let invalid = |msg| Err(eyre::Report::new(BuildError::InvalidConfig(msg)));
    if cfg.protocol.session_word_list().is_empty() {
        return invalid("protocol word list must not be empty");
    }
    if cfg.protocol.digit_lists.is_empty() {
        return invalid("protocol.digit_lists must not be empty");
    }
    if cfg.protocol.stances.is_empty() {
        return invalid("protocol.stances must not be empty");
    }
    if !(0.0..=1.0).contains(&cfg.recognition.min_confidence) {
        return invalid("recognition.min_confidence must be within [0, 1]");
    }
    if cfg.sway.bands_m.windows(2).any(|w| w[0] >= w[1]) {
        return invalid("sway.bands_m must be strictly ascending");
    }
    if cfg.head_motion.event_deg < cfg.head_motion.warn_deg {
        return invalid("head_motion.event_deg must be >= warn_deg");
    }
    let t = &cfg.timers;
    if [
        t.stance_ms,
        t.digit_response_ms,
        t.recall_response_ms,
        t.months_response_ms,
        t.pursuit_segment_ms,
        t.coordination_trial_ms,
    ]
    .contains(&0)
    {
        return invalid("timer durations must be > 0");
    }
    Ok(())
}

impl SessionDriverBuilder {
    pub fn with_config(mut self, cfg: AssessCfg) -> Self {
        self.cfg = Some(Arc::new(cfg));
        self
    }

    pub fn with_shared_config(mut self, cfg: Arc<AssessCfg>) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Inject a clock (e.g., `ManualClock` for tests and replays).
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wall-clock time matching "now" on the injected clock. Orientation
    /// answers and result timestamps derive from it.
    pub fn with_wall_anchor(mut self, anchor: DateTime<Local>) -> Self {
        self.wall_anchor = Some(anchor);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn try_build(self) -> Result<SessionDriver> {
        let cfg = self.cfg.unwrap_or_default();
        validate(&cfg)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let anchor = self.wall_anchor.unwrap_or_else(Local::now);
        Ok(SessionDriver::from_parts(cfg, clock, anchor, self.observers))
    }
}
