//! Session bookkeeping: idempotent completion, progress, resume and skip.

use chrono::{DateTime, Utc};
use rstest::{fixture, rstest};
use sideline_core::config::SessionOrders;
use sideline_core::mocks::RecordingObserver;
use sideline_core::modules::result::{MonthsResult, OrientationResult};
use sideline_core::session::{Advance, ProgressEvent, Recorded, SessionStatus};
use sideline_core::{AssessError, ModuleId, ModuleResult, Session, SessionKind, SessionOrchestrator};

fn orders() -> SessionOrders {
    SessionOrders {
        baseline: vec![ModuleId::Orientation, ModuleId::MonthsReverse],
        concussion: vec![
            ModuleId::Orientation,
            ModuleId::MonthsReverse,
            ModuleId::Balance,
        ],
        post_exercise: vec![ModuleId::MonthsReverse],
    }
}

fn orientation(score: u32) -> ModuleResult {
    ModuleResult::Orientation(OrientationResult {
        answers: Vec::new(),
        score,
        max: 5,
        completed_at: DateTime::<Utc>::UNIX_EPOCH,
    })
}

fn months(score: u32) -> ModuleResult {
    ModuleResult::MonthsReverse(MonthsResult {
        responses: Vec::new(),
        score,
        first_mismatch: None,
        timed_out: false,
        completed_at: DateTime::<Utc>::UNIX_EPOCH,
    })
}

#[fixture]
fn orch() -> (SessionOrchestrator, RecordingObserver) {
    let mut o = SessionOrchestrator::new(orders(), vec!["finger".into()]);
    let observer = RecordingObserver::new();
    o.add_observer(Box::new(observer.clone()));
    (o, observer)
}

#[rstest]
fn duplicate_identical_completion_is_ignored(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, _) = orch;
    let sid = o.create_or_resume(SessionKind::Concussion).id;
    assert!(matches!(
        o.record_completion(sid, ModuleId::Orientation, orientation(5)),
        Ok(Recorded::Stored { .. })
    ));
    assert_eq!(
        o.record_completion(sid, ModuleId::Orientation, orientation(5)),
        Ok(Recorded::Duplicate)
    );
    let s = o.session(sid).unwrap();
    assert_eq!(s.completed, vec![ModuleId::Orientation]);
    assert_eq!(s.results.len(), 1);
}

#[rstest]
fn differing_second_result_is_rejected(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, _) = orch;
    let sid = o.create_or_resume(SessionKind::Concussion).id;
    o.record_completion(sid, ModuleId::Orientation, orientation(5))
        .unwrap();
    assert!(matches!(
        o.record_completion(sid, ModuleId::Orientation, orientation(3)),
        Err(AssessError::InvalidStateTransition(_))
    ));
    assert_eq!(o.session(sid).unwrap().result(ModuleId::Orientation), Some(&orientation(5)));
}

#[rstest]
fn mislabelled_or_foreign_results_are_rejected(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, _) = orch;
    let sid = o.create_or_resume(SessionKind::PostExercise).id;
    assert!(o.record_completion(sid, ModuleId::MonthsReverse, orientation(5)).is_err());
    assert!(o.record_completion(sid, ModuleId::Orientation, orientation(5)).is_err());
    assert!(o.session(sid).unwrap().results.is_empty());
}

#[rstest]
fn progress_tracks_completed_over_required(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, observer) = orch;
    let sid = o.create_or_resume(SessionKind::Baseline).id;
    assert_eq!(o.advance(sid), Ok(Advance::Next(ModuleId::Orientation)));

    let Ok(Recorded::Stored { progress, session_complete }) =
        o.record_completion(sid, ModuleId::Orientation, orientation(4))
    else {
        panic!("expected stored");
    };
    assert!((progress - 0.5).abs() < 1e-9);
    assert!(!session_complete);

    o.record_completion(sid, ModuleId::MonthsReverse, months(1))
        .unwrap();
    assert_eq!(o.session(sid).unwrap().status, SessionStatus::Completed);
    assert_eq!(o.advance(sid), Ok(Advance::AllComplete));

    let events = observer.events();
    assert!(matches!(events.first(), Some(ProgressEvent::SessionStarted { resumed: false, .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::SessionCompleted { .. })));
    assert_eq!(
        observer.last_snapshot().map(|s| s.progress()),
        Some(1.0)
    );
}

#[rstest]
fn open_session_is_resumed_not_duplicated(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, observer) = orch;
    let first = o.create_or_resume(SessionKind::Concussion).id;
    o.record_completion(first, ModuleId::Orientation, orientation(5))
        .unwrap();
    let again = o.create_or_resume(SessionKind::Concussion).id;
    assert_eq!(first, again);
    assert_eq!(o.sessions().len(), 1);
    assert_eq!(o.advance(again), Ok(Advance::Next(ModuleId::MonthsReverse)));
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, ProgressEvent::SessionStarted { resumed: true, .. })));

    // a different kind gets its own session
    let other = o.create_or_resume(SessionKind::Baseline).id;
    assert_ne!(other, first);
}

#[rstest]
fn skipped_module_blocks_completion_until_retried(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, _) = orch;
    let sid = o.create_or_resume(SessionKind::Baseline).id;
    o.skip(sid, ModuleId::Orientation).unwrap();
    assert_eq!(o.advance(sid), Ok(Advance::Next(ModuleId::MonthsReverse)));
    o.record_completion(sid, ModuleId::MonthsReverse, months(0))
        .unwrap();
    assert_eq!(
        o.advance(sid),
        Ok(Advance::OnlySkipped(vec![ModuleId::Orientation]))
    );
    assert!(o.session(sid).unwrap().is_open());

    assert_eq!(o.retry_skipped(sid), Ok(vec![ModuleId::Orientation]));
    assert_eq!(o.advance(sid), Ok(Advance::Next(ModuleId::Orientation)));
    o.record_completion(sid, ModuleId::Orientation, orientation(5))
        .unwrap();
    assert_eq!(o.advance(sid), Ok(Advance::AllComplete));
}

#[rstest]
fn completed_module_cannot_be_skipped(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, _) = orch;
    let sid = o.create_or_resume(SessionKind::Baseline).id;
    o.record_completion(sid, ModuleId::Orientation, orientation(5))
        .unwrap();
    assert!(o.skip(sid, ModuleId::Orientation).is_err());
    assert!(o.skip(sid, ModuleId::Balance).is_err());
}

#[rstest]
fn abandoned_session_rejects_results(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, observer) = orch;
    let sid = o.create_or_resume(SessionKind::Baseline).id;
    o.abandon(sid).unwrap();
    assert!(o.record_completion(sid, ModuleId::Orientation, orientation(5)).is_err());
    assert!(o.advance(sid).is_err());
    assert!(matches!(
        observer.events().last(),
        Some(ProgressEvent::SessionAbandoned { .. })
    ));
    // a fresh session starts after abandonment
    assert_ne!(o.create_or_resume(SessionKind::Baseline).id, sid);
}

#[rstest]
fn restore_validates_persisted_results(orch: (SessionOrchestrator, RecordingObserver)) {
    let (mut o, _) = orch;
    let mut s = Session::new(
        SessionKind::Baseline,
        orders().baseline,
        vec!["finger".into()],
        DateTime::<Utc>::UNIX_EPOCH,
    );
    s.results.push(orientation(5));
    assert!(o.restore(s.clone()).is_err());

    s.completed.push(ModuleId::Orientation);
    let id = s.id;
    o.restore(s.clone()).unwrap();
    assert!(o.restore(s).is_err());
    assert_eq!(o.create_or_resume(SessionKind::Baseline).id, id);
}

#[test]
fn session_round_trips_through_json() {
    let mut s = Session::new(
        SessionKind::Concussion,
        orders().concussion,
        vec!["finger".into()],
        DateTime::<Utc>::UNIX_EPOCH,
    );
    s.completed.push(ModuleId::Orientation);
    s.results.push(orientation(4));
    s.status = SessionStatus::InProgress { current_index: 1 };
    let json = serde_json::to_string(&s).unwrap();
    let back: Session = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
}
