//! Countdown timers driven by an external millisecond clock.
//!
//! A `Countdown` never reads a clock itself; callers pass "now" in
//! milliseconds. That keeps module state machines deterministic under
//! `ManualClock` and lets one clock drive every timer in a session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownState {
    Idle,
    Running { since_ms: u64, banked_ms: u64 },
    Paused { banked_ms: u64 },
    Expired,
    Cancelled,
}

/// Single-shot countdown with pause/resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    duration_ms: u64,
    state: CountdownState,
}

impl Countdown {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            state: CountdownState::Idle,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// (Re)start from zero.
    pub fn start(&mut self, now_ms: u64) {
        self.state = CountdownState::Running {
            since_ms: now_ms,
            banked_ms: 0,
        };
    }

    pub fn pause(&mut self, now_ms: u64) -> bool {
        if let CountdownState::Running {
            since_ms,
            banked_ms,
        } = self.state
        {
            self.state = CountdownState::Paused {
                banked_ms: banked_ms + now_ms.saturating_sub(since_ms),
            };
            return true;
        }
        false
    }

    pub fn resume(&mut self, now_ms: u64) -> bool {
        if let CountdownState::Paused { banked_ms } = self.state {
            self.state = CountdownState::Running {
                since_ms: now_ms,
                banked_ms,
            };
            return true;
        }
        false
    }

    /// Stop without firing. A cancelled countdown never expires.
    pub fn cancel(&mut self) {
        if !matches!(self.state, CountdownState::Expired) {
            self.state = CountdownState::Cancelled;
        }
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let raw = match self.state {
            CountdownState::Idle | CountdownState::Cancelled => 0,
            CountdownState::Running {
                since_ms,
                banked_ms,
            } => banked_ms + now_ms.saturating_sub(since_ms),
            CountdownState::Paused { banked_ms } => banked_ms,
            CountdownState::Expired => self.duration_ms,
        };
        raw.min(self.duration_ms)
    }

    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.duration_ms - self.elapsed_ms(now_ms)
    }

    /// Returns `true` exactly once, on the first poll at or after expiry.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if let CountdownState::Running { .. } = self.state
            && self.elapsed_ms(now_ms) >= self.duration_ms
        {
            self.state = CountdownState::Expired;
            return true;
        }
        false
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, CountdownState::Paused { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.state, CountdownState::Expired)
    }
}

/// Cooperative cancellation flag shared between threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
