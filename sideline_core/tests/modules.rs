//! Module state machines driven directly with a manual clock.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rstest::rstest;
use sideline_core::config::AssessCfg;
use sideline_core::metrics::Axis;
use sideline_core::modules::balance::{BalanceModule, StancePhase};
use sideline_core::modules::coordination::CoordinationModule;
use sideline_core::modules::digit_span::{DigitPhase, DigitSpanModule};
use sideline_core::modules::months_reverse::MonthsReverseModule;
use sideline_core::modules::orientation::OrientationModule;
use sideline_core::modules::recall::{RecallModule, RecallPhase};
use sideline_core::modules::smooth_pursuit::SmoothPursuitModule;
use sideline_core::modules::{
    AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult, SharedClock,
};
use sideline_core::scoring::standard_questions;
use sideline_core::{AssessError, ModuleStatus, VoiceCommand};
use sideline_traits::{Clock, ManualClock, PoseSample};

fn core(id: ModuleId, clock: &ManualClock) -> ModuleCore {
    let shared: SharedClock = Arc::new(clock.clone());
    ModuleCore::new(
        id,
        shared,
        DateTime::<Utc>::UNIX_EPOCH,
        AssessCfg::default().vocabulary(id),
    )
}

fn words() -> Vec<String> {
    ["finger", "penny", "blanket", "lemon", "insect"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn answer(text: &str) -> VoiceCommand {
    VoiceCommand::Answer(text.into())
}

// ── Balance ──────────────────────────────────────────────────────────────────

fn balance(clock: &ManualClock) -> BalanceModule {
    let cfg = AssessCfg::default();
    BalanceModule::new(
        core(ModuleId::Balance, clock),
        cfg.protocol.stances.clone(),
        20_000,
        10,
        cfg.sway.clone(),
    )
}

#[test]
fn balance_without_stances_completes_empty() {
    let clock = ManualClock::new();
    let mut m = BalanceModule::new(
        core(ModuleId::Balance, &clock),
        Vec::new(),
        20_000,
        10,
        AssessCfg::default().sway,
    );
    assert!(m.execute(VoiceCommand::Start).is_err());
    assert_eq!(m.current_stance(), None);
    assert_eq!(m.poll(), ModuleStatus::Complete);
    let ModuleResult::Balance(r) = m.finalize().unwrap() else {
        panic!("expected balance result");
    };
    assert!(r.stances.is_empty());
    assert_eq!(r.total_errors, 0);
}

#[test]
fn balance_errors_clamp_at_ceiling() {
    let clock = ManualClock::new();
    let mut m = balance(&clock);
    m.execute(VoiceCommand::Start).unwrap();
    for _ in 0..12 {
        m.execute(VoiceCommand::AddError).unwrap();
    }
    assert_eq!(m.errors(), 10);
}

#[test]
fn balance_pause_freezes_timer_and_undo_works() {
    let clock = ManualClock::new();
    let mut m = balance(&clock);
    m.execute(VoiceCommand::Start).unwrap();
    m.execute(VoiceCommand::AddError).unwrap();
    m.execute(VoiceCommand::AddError).unwrap();
    clock.advance_ms(5_000);
    m.execute(VoiceCommand::Pause).unwrap();
    clock.advance_ms(60_000);
    assert_eq!(m.poll(), ModuleStatus::Running);
    assert_eq!(m.remaining_ms(), 15_000);

    m.execute(VoiceCommand::UndoError).unwrap();
    assert_eq!(m.errors(), 1);
    assert!(m.execute(VoiceCommand::AddError).is_err());

    m.execute(VoiceCommand::Resume).unwrap();
    clock.advance_ms(15_000);
    m.poll();
    assert_eq!(m.phase(), StancePhase::Done);
}

#[test]
fn balance_runs_every_stance_then_completes() {
    let clock = ManualClock::new();
    let mut m = balance(&clock);
    for stance in 0..3 {
        if stance > 0 {
            m.execute(VoiceCommand::Next).unwrap();
        }
        m.execute(VoiceCommand::Start).unwrap();
        for _ in 0..12 {
            m.execute(VoiceCommand::AddError).unwrap();
        }
        m.on_pose(&PoseSample::at([0.0, 1.6, 0.0], 0));
        m.on_pose(&PoseSample::at([0.02, 1.6, 0.0], 33));
        clock.advance_ms(20_000);
        m.poll();
    }
    assert_eq!(m.poll(), ModuleStatus::Complete);
    let ModuleResult::Balance(r) = m.finalize().unwrap() else {
        panic!("expected balance result");
    };
    assert_eq!(r.total_errors, 30);
    assert_eq!(r.max_errors, 30);
    assert!(r.peak_sway_m.is_some_and(|s| (s - 0.02).abs() < 1e-9));
    assert_eq!(m.finalize(), Err(AssessError::AlreadyFinalized));
}

#[test]
fn balance_selects_stance_by_name() {
    let clock = ManualClock::new();
    let mut m = balance(&clock);
    m.execute(VoiceCommand::SelectByName("tandem".into())).unwrap();
    assert_eq!(m.current_stance(), Some("tandem"));
    m.execute(VoiceCommand::Start).unwrap();
    m.execute(VoiceCommand::Stop).unwrap();
    assert!(
        m.execute(VoiceCommand::SelectByName("tandem".into()))
            .is_err()
    );
}

#[test]
fn balance_tracking_loss_invalidates_stance_sway() {
    let clock = ManualClock::new();
    let mut m = balance(&clock);
    for _ in 0..3 {
        m.execute(VoiceCommand::Start).unwrap();
        m.on_pose(&PoseSample::at([0.0, 1.6, 0.0], 0));
        m.on_tracking(false);
        m.execute(VoiceCommand::Stop).unwrap();
        let _ = m.execute(VoiceCommand::Next);
    }
    let ModuleResult::Balance(r) = m.finalize().unwrap() else {
        panic!("expected balance result");
    };
    assert!(r.stances.iter().all(|s| !s.sway.valid && s.stopped_early));
    assert_eq!(r.peak_sway_m, None);
}

// ── Digit span ───────────────────────────────────────────────────────────────

fn digit_span(clock: &ManualClock) -> DigitSpanModule {
    let cfg = AssessCfg::default();
    DigitSpanModule::new(
        core(ModuleId::DigitSpan, clock),
        &cfg.protocol.digit_lists,
        1_000,
        10_000,
        2,
    )
}

#[test]
fn digit_span_stops_after_two_consecutive_failures() {
    let clock = ManualClock::new();
    let mut m = digit_span(&clock);

    // 4-9-3 reversed is 3-9-4
    m.execute(VoiceCommand::Start).unwrap();
    clock.advance_ms(3_000);
    assert!(m.accepts_answers());
    m.execute(answer("three nine four")).unwrap();
    assert_eq!(m.phase(), DigitPhase::Scored);

    // next length: 3-8-1-4, answered wrong twice
    m.execute(VoiceCommand::Next).unwrap();
    clock.advance_ms(4_000);
    m.execute(answer("1 2 3 4")).unwrap();
    m.execute(VoiceCommand::Next).unwrap();
    clock.advance_ms(4_000);
    m.execute(answer("9 7 2 8")).unwrap();

    assert_eq!(m.poll(), ModuleStatus::Complete);
    let ModuleResult::DigitSpan(r) = m.finalize().unwrap() else {
        panic!("expected digit span result");
    };
    assert_eq!(r.score, 1);
    assert_eq!(r.max, 4);
    assert!(r.stopped_early);
    assert_eq!(r.trials.len(), 3);
    assert_eq!(r.trials[2].first_mismatch, Some(3));
}

#[test]
fn digit_span_timeout_counts_as_failure() {
    let clock = ManualClock::new();
    let mut m = digit_span(&clock);
    m.execute(VoiceCommand::Start).unwrap();
    clock.advance_ms(3_000);
    m.poll();
    clock.advance_ms(10_000);
    m.poll();
    assert_eq!(m.phase(), DigitPhase::Scored);
    assert!(!m.accepts_answers());
}

#[test]
fn digit_span_rejects_unparseable_answer() {
    let clock = ManualClock::new();
    let mut m = digit_span(&clock);
    m.execute(VoiceCommand::Start).unwrap();
    clock.advance_ms(3_000);
    assert_eq!(
        m.execute(answer("purple")),
        Err(AssessError::RecognitionFailure)
    );
    assert!(m.accepts_answers());
}

// ── Recall ───────────────────────────────────────────────────────────────────

#[test]
fn immediate_recall_scores_each_trial() {
    let clock = ManualClock::new();
    let cfg = AssessCfg::default();
    let mut m = RecallModule::immediate(
        core(ModuleId::ImmediateRecall, &clock),
        words(),
        1_000,
        30_000,
        &cfg.scoring,
    );

    m.execute(VoiceCommand::Start).unwrap();
    clock.advance_ms(5_000);
    m.execute(answer("finger lemon um penny done")).unwrap();
    assert_eq!(m.phase(), RecallPhase::BetweenTrials);

    m.execute(VoiceCommand::Next).unwrap();
    clock.advance_ms(5_000);
    m.execute(answer("finger penny blanket lemon insect")).unwrap();
    m.execute(VoiceCommand::Complete).unwrap();

    m.execute(VoiceCommand::Start).unwrap();
    clock.advance_ms(5_000);
    m.poll();
    clock.advance_ms(30_000);
    assert_eq!(m.poll(), ModuleStatus::Complete);

    let ModuleResult::ImmediateRecall(r) = m.finalize().unwrap() else {
        panic!("expected immediate recall result");
    };
    let scores: Vec<u32> = r.trials.iter().map(|t| t.score).collect();
    assert_eq!(scores, vec![3, 5, 0]);
    assert!(r.trials[2].timed_out);
    assert_eq!(r.score, 8);
    assert_eq!(r.max, 15);
}

#[test]
fn delayed_recall_waits_for_retention_gate() {
    let clock = ManualClock::new();
    let cfg = AssessCfg::default();
    let learned_at = clock.now();
    clock.advance_ms(60_000);
    let mut m = RecallModule::delayed(
        core(ModuleId::DelayedRecall, &clock),
        words(),
        Some(learned_at),
        300_000,
        30_000,
        &cfg.scoring,
    );

    assert_eq!(
        m.execute(VoiceCommand::Start),
        Err(AssessError::RetentionGate {
            remaining_ms: 240_000
        })
    );
    clock.advance_ms(240_000);
    m.execute(VoiceCommand::Start).unwrap();
    m.execute(answer("lemon, insect, finished")).unwrap();

    let ModuleResult::DelayedRecall(r) = m.finalize().unwrap() else {
        panic!("expected delayed recall result");
    };
    assert_eq!(r.score, 2);
    assert_eq!(r.max, 5);
}

// ── Months in reverse ────────────────────────────────────────────────────────

#[rstest]
#[case(
    "december november october september august july june may april march february january",
    1
)]
#[case("december november october august", 0)]
fn months_reverse_is_all_or_nothing(#[case] said: &str, #[case] expected: u32) {
    let clock = ManualClock::new();
    let cfg = AssessCfg::default();
    let mut m = MonthsReverseModule::new(core(ModuleId::MonthsReverse, &clock), 30_000, &cfg.scoring);
    m.execute(VoiceCommand::Start).unwrap();
    m.execute(answer(said)).unwrap();
    m.execute(VoiceCommand::Complete).unwrap();
    let ModuleResult::MonthsReverse(r) = m.finalize().unwrap() else {
        panic!("expected months result");
    };
    assert_eq!(r.score, expected);
}

// ── Orientation ──────────────────────────────────────────────────────────────

#[test]
fn orientation_scores_against_local_time() {
    let clock = ManualClock::new();
    let now = NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_opt(14, 30, 0))
        .unwrap();
    let mut m = OrientationModule::new(
        core(ModuleId::Orientation, &clock),
        standard_questions(now),
        60,
    );
    for said in ["March", "15th", "Thursday"] {
        m.execute(answer(said)).unwrap();
    }
    m.execute(VoiceCommand::Previous).unwrap();
    m.execute(answer("friday")).unwrap();
    m.execute(answer("2024")).unwrap();
    assert_eq!(m.poll(), ModuleStatus::Running);
    m.execute(answer("2:45 pm")).unwrap();
    assert_eq!(m.poll(), ModuleStatus::Complete);
    assert!(m.execute(VoiceCommand::Complete).is_err());

    let ModuleResult::Orientation(r) = m.finalize().unwrap() else {
        panic!("expected orientation result");
    };
    assert_eq!(r.score, 5);
    assert_eq!(r.max, 5);
}

#[test]
fn orientation_unanswered_questions_score_zero() {
    let clock = ManualClock::new();
    let now = NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_opt(0, 20, 0))
        .unwrap();
    let mut m = OrientationModule::new(
        core(ModuleId::Orientation, &clock),
        standard_questions(now),
        60,
    );
    m.execute(answer("march")).unwrap();
    m.execute(VoiceCommand::Next).unwrap();
    m.execute(VoiceCommand::Next).unwrap();
    m.execute(VoiceCommand::Next).unwrap();
    // 11:50 pm is within an hour of 00:20 across midnight
    m.execute(answer("11:50 pm")).unwrap();
    let ModuleResult::Orientation(r) = m.finalize().unwrap() else {
        panic!("expected orientation result");
    };
    assert_eq!(r.score, 2);
}

#[test]
fn orientation_skip_leaves_only_the_current_question_unanswered() {
    let clock = ManualClock::new();
    let now = NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_opt(14, 30, 0))
        .unwrap();
    let mut m = OrientationModule::new(
        core(ModuleId::Orientation, &clock),
        standard_questions(now),
        60,
    );
    m.execute(answer("March")).unwrap();
    m.execute(VoiceCommand::Skip).unwrap();
    assert_eq!(m.poll(), ModuleStatus::Running);
    for said in ["friday", "2024", "2:30 pm"] {
        m.execute(answer(said)).unwrap();
    }
    assert_eq!(m.poll(), ModuleStatus::Complete);

    let ModuleResult::Orientation(r) = m.finalize().unwrap() else {
        panic!("expected orientation result");
    };
    assert_eq!(r.score, 4);
    assert!(r.answers[1].response.is_none());
    assert!(!r.answers[1].correct);
}

// ── Coordination ─────────────────────────────────────────────────────────────

#[test]
fn coordination_keeps_best_passed_trial() {
    let clock = ManualClock::new();
    let mut m = CoordinationModule::new(core(ModuleId::Coordination, &clock), 3, 30_000);

    m.execute(VoiceCommand::Start).unwrap();
    clock.advance_ms(12_000);
    m.execute(VoiceCommand::Stop).unwrap();

    m.execute(VoiceCommand::Next).unwrap();

    m.execute(VoiceCommand::Start).unwrap();
    clock.advance_ms(31_000);
    assert_eq!(m.poll(), ModuleStatus::Complete);

    let ModuleResult::Coordination(r) = m.finalize().unwrap() else {
        panic!("expected coordination result");
    };
    assert_eq!(r.best_ms, Some(12_000));
    assert!(r.trials[2].timed_out);
    assert!(!r.trials[1].passed && r.trials[1].duration_ms.is_none());
}

// ── Smooth pursuit ───────────────────────────────────────────────────────────

#[test]
fn smooth_pursuit_aggregates_valid_segments_only() {
    let clock = ManualClock::new();
    let cfg = AssessCfg::default();
    let mut m = SmoothPursuitModule::new(core(ModuleId::SmoothPursuit, &clock), 10_000, cfg.head_motion);
    m.on_focus(true);

    m.execute(VoiceCommand::Start).unwrap();
    assert_eq!(m.current_axis(), Some(Axis::Horizontal));
    clock.advance_ms(4_000);
    m.on_focus(false);
    clock.advance_ms(1_000);
    m.on_focus(true);
    clock.advance_ms(5_000);
    m.poll();

    m.execute(VoiceCommand::Next).unwrap();
    m.on_tracking(false);
    clock.advance_ms(10_000);
    assert_eq!(m.poll(), ModuleStatus::Complete);

    let ModuleResult::SmoothPursuit(r) = m.finalize().unwrap() else {
        panic!("expected pursuit result");
    };
    assert_eq!(r.segments.len(), 2);
    assert!(!r.segments[1].focus.valid);
    assert!((r.focus_ratio - 0.9).abs() < 1e-9);
    assert_eq!(r.focus_breaks, 1);
}

#[test]
fn smooth_pursuit_counts_one_event_for_a_sustained_head_turn() {
    let clock = ManualClock::new();
    let cfg = AssessCfg::default();
    assert_eq!((cfg.head_motion.warn_deg, cfg.head_motion.event_deg), (5.0, 8.0));
    let mut m = SmoothPursuitModule::new(core(ModuleId::SmoothPursuit, &clock), 10_000, cfg.head_motion);

    // 9 degrees of yaw, held across several samples
    let half = 9.0_f64.to_radians() / 2.0;
    let turned = [0.0, half.sin(), 0.0, half.cos()];
    m.execute(VoiceCommand::Start).unwrap();
    m.on_pose(&PoseSample::new([0.0; 3], PoseSample::IDENTITY_ORIENTATION, 0));
    for ts in [100, 200, 300, 400] {
        m.on_pose(&PoseSample::new([0.0; 3], turned, ts));
    }
    m.execute(VoiceCommand::Stop).unwrap();
    m.execute(VoiceCommand::Next).unwrap();
    m.execute(VoiceCommand::Stop).unwrap();
    assert_eq!(m.poll(), ModuleStatus::Complete);

    let ModuleResult::SmoothPursuit(r) = m.finalize().unwrap() else {
        panic!("expected pursuit result");
    };
    let head = &r.segments[0].head;
    assert_eq!(head.motion_events, 1);
    assert_eq!(r.head_motion_events, 1);
    // only the interval before the turn counts as still
    assert_eq!((head.still_ms, head.total_ms), (100, 400));
    assert!(head.peak_deg > 8.0);
}

// ── Common commands ──────────────────────────────────────────────────────────

#[test]
fn skip_and_exit_end_any_module() {
    let clock = ManualClock::new();
    let mut m = balance(&clock);
    m.execute(VoiceCommand::Start).unwrap();
    m.execute(VoiceCommand::Skip).unwrap();
    assert_eq!(m.poll(), ModuleStatus::Skipped);
    assert!(m.execute(VoiceCommand::AddError).is_err());

    let mut d = digit_span(&clock);
    d.execute(VoiceCommand::Exit).unwrap();
    assert_eq!(d.poll(), ModuleStatus::Exited);
}
