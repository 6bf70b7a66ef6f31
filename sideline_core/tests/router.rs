//! Voice routing: single controller slot, supersession, suppression,
//! confidence gating and the manual-input fallback.

use std::sync::{Arc, Mutex};

use rstest::rstest;
use sideline_core::AssessError;
use sideline_core::config::RecognitionCfg;
use sideline_core::modules::CommandReceiver;
use sideline_core::voice::{
    CommandKind, DispatchOutcome, SharedReceiver, TranscriptEvent, Vocabulary, VoiceCommand,
    VoiceCommandRouter,
};

struct Controller {
    vocabulary: Vocabulary,
    names: Vec<String>,
    answers: bool,
    seen: Vec<VoiceCommand>,
    refuse: bool,
}

impl Controller {
    fn new() -> Self {
        Self {
            vocabulary: Vocabulary::new()
                .with(CommandKind::Start, ["start", "begin"])
                .with(CommandKind::Stop, ["stop"])
                .with(CommandKind::AddError, ["error", "plus one"])
                .with(CommandKind::Skip, ["skip"]),
            names: Vec::new(),
            answers: false,
            seen: Vec::new(),
            refuse: false,
        }
    }
}

impl CommandReceiver for Controller {
    fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn accepts_answers(&self) -> bool {
        self.answers
    }

    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError> {
        if self.refuse {
            return Err(AssessError::transition("refused"));
        }
        self.seen.push(command);
        Ok(())
    }
}

fn shared(c: Controller) -> (Arc<Mutex<Controller>>, SharedReceiver) {
    let concrete = Arc::new(Mutex::new(c));
    let receiver: SharedReceiver = concrete.clone();
    (concrete, receiver)
}

fn router() -> VoiceCommandRouter {
    VoiceCommandRouter::new(RecognitionCfg {
        min_confidence: 0.5,
        fallback_after: 2,
    })
}

#[test]
fn dispatches_to_active_controller() {
    let mut r = router();
    let (c, recv) = shared(Controller::new());
    r.set_active_controller(&recv);

    let out = r.handle(TranscriptEvent::final_text("  Start. "));
    assert_eq!(out, vec![DispatchOutcome::Dispatched(VoiceCommand::Start)]);
    assert_eq!(c.lock().unwrap().seen, vec![VoiceCommand::Start]);
}

#[test]
fn queued_transcript_is_dropped_after_controller_swap() {
    let mut r = router();
    let (old, old_recv) = shared(Controller::new());
    let (new, new_recv) = shared(Controller::new());
    r.set_active_controller(&old_recv);

    r.submit(TranscriptEvent::final_text("start"));
    r.set_active_controller(&new_recv);
    r.submit(TranscriptEvent::final_text("stop"));

    assert_eq!(r.process_next(), Some(DispatchOutcome::Superseded));
    assert_eq!(
        r.process_next(),
        Some(DispatchOutcome::Dispatched(VoiceCommand::Stop))
    );
    assert!(old.lock().unwrap().seen.is_empty());
    assert_eq!(new.lock().unwrap().seen, vec![VoiceCommand::Stop]);
}

#[test]
fn stale_registration_cannot_clear_newer_controller() {
    let mut r = router();
    let (_a, a) = shared(Controller::new());
    let (_b, b) = shared(Controller::new());
    let first = r.set_active_controller(&a);
    let second = r.set_active_controller(&b);

    assert!(!r.clear_active_controller(&first));
    assert!(r.has_controller());
    assert!(r.clear_active_controller(&second));
    assert!(!r.has_controller());
}

#[test]
fn dropped_controller_reports_no_controller() {
    let mut r = router();
    let (c, recv) = shared(Controller::new());
    r.set_active_controller(&recv);
    drop(c);
    drop(recv);
    assert_eq!(
        r.handle(TranscriptEvent::final_text("start")),
        vec![DispatchOutcome::NoController]
    );
}

#[test]
fn suppression_drops_speech_but_not_manual_input() {
    let mut r = router();
    let (c, recv) = shared(Controller::new());
    r.set_active_controller(&recv);
    r.set_suppressed(true);

    assert_eq!(
        r.handle(TranscriptEvent::final_text("start")),
        vec![DispatchOutcome::Suppressed]
    );
    assert_eq!(
        r.dispatch_manual(VoiceCommand::Start),
        DispatchOutcome::Dispatched(VoiceCommand::Start)
    );
    r.set_suppressed(false);
    r.handle(TranscriptEvent::final_text("stop"));
    assert_eq!(
        c.lock().unwrap().seen,
        vec![VoiceCommand::Start, VoiceCommand::Stop]
    );
}

#[test]
fn partials_are_provisional() {
    let mut r = router();
    let (c, recv) = shared(Controller::new());
    r.set_active_controller(&recv);
    assert_eq!(
        r.handle(TranscriptEvent::partial("sta")),
        vec![DispatchOutcome::Provisional]
    );
    assert!(c.lock().unwrap().seen.is_empty());
}

#[test]
fn repeated_failures_prompt_for_manual_input() {
    let mut r = router();
    let (_c, recv) = shared(Controller::new());
    r.set_active_controller(&recv);

    assert_eq!(
        r.handle(TranscriptEvent::final_text("start").with_confidence(0.2)),
        vec![DispatchOutcome::LowConfidence]
    );
    assert_eq!(
        r.handle(TranscriptEvent::final_text("banana")),
        vec![DispatchOutcome::FallbackPrompt]
    );
    // streak resets after the prompt
    assert_eq!(
        r.handle(TranscriptEvent::final_text("banana")),
        vec![DispatchOutcome::NoMatch]
    );
}

#[test]
fn success_resets_failure_streak() {
    let mut r = router();
    let (_c, recv) = shared(Controller::new());
    r.set_active_controller(&recv);
    r.handle(TranscriptEvent::final_text("banana"));
    r.handle(TranscriptEvent::final_text("start"));
    assert_eq!(
        r.handle(TranscriptEvent::final_text("banana")),
        vec![DispatchOutcome::NoMatch]
    );
}

#[test]
fn refused_command_is_reported_not_fatal() {
    let mut r = router();
    let mut c = Controller::new();
    c.refuse = true;
    let (_c, recv) = shared(c);
    r.set_active_controller(&recv);
    let out = r.handle(TranscriptEvent::final_text("stop"));
    assert!(matches!(
        out.as_slice(),
        [DispatchOutcome::Rejected {
            command: VoiceCommand::Stop,
            error: AssessError::InvalidStateTransition(_)
        }]
    ));
}

#[rstest]
#[case("double leg", VoiceCommand::SelectByName("double_leg".into()))]
#[case("let's do tandem now", VoiceCommand::SelectByName("tandem".into()))]
#[case("plus one", VoiceCommand::AddError)]
fn names_resolve_after_literal_aliases(#[case] said: &str, #[case] expected: VoiceCommand) {
    let mut r = router();
    let mut c = Controller::new();
    c.names = vec!["double_leg".into(), "single_leg".into(), "tandem".into()];
    let (c, recv) = shared(c);
    r.set_active_controller(&recv);
    r.handle(TranscriptEvent::final_text(said));
    assert_eq!(c.lock().unwrap().seen, vec![expected]);
}

#[test]
fn unmatched_speech_becomes_answer_when_accepted() {
    let mut r = router();
    let mut c = Controller::new();
    c.answers = true;
    let (c, recv) = shared(c);
    r.set_active_controller(&recv);
    r.handle(TranscriptEvent::final_text("Lemon, penny"));
    r.handle(TranscriptEvent::final_text("skip"));
    assert_eq!(
        c.lock().unwrap().seen,
        vec![VoiceCommand::Answer("lemon, penny".into()), VoiceCommand::Skip]
    );
}
