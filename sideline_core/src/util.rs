//! Small time helpers shared by the sampler and the module timers.

/// Sampling period in microseconds for `hz`, treating 0 Hz as 1 Hz and
/// never returning less than 1 µs.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (1_000_000 / u64::from(hz.max(1))).max(1)
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// How long it takes to present `items` stimuli paced `interval_ms` apart.
#[inline]
pub fn pacing_ms(items: usize, interval_ms: u64) -> u64 {
    u64::try_from(items)
        .unwrap_or(u64::MAX)
        .saturating_mul(interval_ms)
}
