// Focused tests for the time helpers.
use sideline_core::util::{duration_ms, pacing_ms, period_us};
use std::time::Duration;

#[test]
fn period_us_clamps_and_floors() {
    // hz=30 → 33_333µs
    assert_eq!(period_us(30), 33_333);
    assert_eq!(period_us(1), 1_000_000);
    // Very high hz floors to 1µs minimum
    assert_eq!(period_us(1_000_000), 1);
    assert_eq!(period_us(u32::MAX), 1);
}

#[test]
fn zero_hz_is_treated_as_one() {
    assert_eq!(period_us(0), 1_000_000);
}

#[test]
fn duration_ms_truncates() {
    assert_eq!(duration_ms(Duration::from_micros(1_999)), 1);
    assert_eq!(duration_ms(Duration::from_secs(20)), 20_000);
}

#[test]
fn pacing_covers_every_item() {
    assert_eq!(pacing_ms(5, 1_000), 5_000);
    assert_eq!(pacing_ms(0, 1_000), 0);
    assert_eq!(pacing_ms(usize::MAX, u64::MAX), u64::MAX);
}
