//! Deterministic replay of a JSONL input script.
//!
//! Each line is `{"at_ms": <offset>, <input>}` where `<input>` is one of
//! `"say"`, `"partial"`, `"manual"`, `"gesture"`, `"focus"`, `"tracking"`,
//! `"pose"` or `"control"`. `at_ms` is measured from script start and must
//! not go backwards. Driver events are printed to stdout as JSON lines.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use eyre::WrapErr;
use serde::Deserialize;
use serde_json::{Value, json};
use sideline_core::{
    AssessCfg, DispatchOutcome, Session, SessionDriver, SessionKind, TranscriptEvent, VoiceCommand,
};
use sideline_traits::{ManualClock, PoseSample};

use crate::score::parse_local;

pub struct ReplayArgs<'a> {
    pub script: &'a Path,
    pub kind: SessionKind,
    pub anchor: Option<&'a str>,
    pub restore: Option<&'a Path>,
    pub save: Option<&'a Path>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Control {
    /// Only advance the clock and let timers fire.
    Wait,
    Resume,
    RetrySkipped,
    Cancel,
}

#[derive(Debug, Deserialize)]
struct PoseStep {
    position: [f64; 3],
    #[serde(default = "identity")]
    orientation: [f64; 4],
}

fn identity() -> [f64; 4] {
    PoseSample::IDENTITY_ORIENTATION
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Input {
    Say(String),
    Partial(String),
    Manual(VoiceCommand),
    Gesture(bool),
    Focus(bool),
    Tracking(bool),
    Pose(PoseStep),
    Control(Control),
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(default)]
    at_ms: u64,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(flatten)]
    input: Input,
}

fn parse_script(text: impl BufRead) -> eyre::Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut last_ms = 0;
    for (idx, line) in text.lines().enumerate() {
        let line = line.wrap_err("read replay script")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: Step = serde_json::from_str(trimmed)
            .wrap_err_with(|| format!("replay script line {}", idx + 1))?;
        if step.at_ms < last_ms {
            eyre::bail!(
                "replay script line {}: at_ms {} goes backwards (previous {last_ms})",
                idx + 1,
                step.at_ms
            );
        }
        last_ms = step.at_ms;
        steps.push(step);
    }
    Ok(steps)
}

fn emit(at_ms: u64, mut value: Value) {
    if let Value::Object(map) = &mut value {
        map.insert("at_ms".into(), at_ms.into());
    }
    println!("{value}");
}

fn report_outcome(at_ms: u64, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::Dispatched(command) => {
            tracing::debug!(at_ms, command = command.label(), "dispatched");
        }
        DispatchOutcome::Rejected { command, error } => emit(
            at_ms,
            json!({
                "event": "rejected",
                "command": command.label(),
                "error": error.to_string(),
            }),
        ),
        other => tracing::debug!(at_ms, outcome = ?other, "not dispatched"),
    }
}

fn apply(driver: &mut SessionDriver, step: Step, at_ms: u64) -> eyre::Result<()> {
    match step.input {
        Input::Say(text) => {
            let mut event = TranscriptEvent::final_text(text);
            event.confidence = step.confidence;
            for outcome in driver.on_transcript(event)? {
                report_outcome(at_ms, &outcome);
            }
        }
        Input::Partial(text) => {
            driver.on_transcript(TranscriptEvent::partial(text))?;
        }
        Input::Manual(command) => report_outcome(at_ms, &driver.on_manual(command)?),
        Input::Gesture(active) => driver.set_gesture_active(active),
        Input::Focus(focused) => driver.on_focus(focused),
        Input::Tracking(available) => driver.on_tracking(available),
        Input::Pose(p) => driver.on_pose(&PoseSample::new(p.position, p.orientation, at_ms)),
        Input::Control(Control::Wait) => {}
        Input::Control(Control::Resume) => driver.resume()?,
        Input::Control(Control::RetrySkipped) => {
            let modules = driver.retry_skipped()?;
            tracing::info!(?modules, "skipped modules re-queued");
        }
        Input::Control(Control::Cancel) => driver.cancel()?,
    }
    Ok(())
}

pub fn load_session(path: &Path) -> eyre::Result<Session> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("read session file {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("parse session file {}", path.display()))
}

pub fn save_session(path: &Path, session: &Session) -> eyre::Result<()> {
    let text = serde_json::to_string_pretty(session)?;
    fs::write(path, text).wrap_err_with(|| format!("write session file {}", path.display()))?;
    tracing::info!(path = %path.display(), session = %session.id, "session saved");
    Ok(())
}

pub fn run_replay(cfg: AssessCfg, args: &ReplayArgs<'_>) -> eyre::Result<()> {
    let file = fs::File::open(args.script)
        .wrap_err_with(|| format!("open replay script {}", args.script.display()))?;
    let steps = parse_script(BufReader::new(file))?;

    let anchor = match args.anchor {
        Some(text) => {
            let naive = parse_local(text)?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| eyre::eyre!("anchor {text:?} does not exist in the local timezone"))?
        }
        None => Local::now(),
    };

    let clock = ManualClock::new();
    let mut driver = SessionDriver::builder()
        .with_config(cfg)
        .with_clock(Arc::new(clock.clone()))
        .with_wall_anchor(anchor)
        .try_build()?;
    if let Some(path) = args.restore {
        driver.restore(load_session(path)?)?;
    }

    let sid = driver.start(args.kind)?;
    tracing::info!(session = %sid, steps = steps.len(), "replay started");
    flush(&mut driver, 0)?;

    for step in steps {
        let at_ms = step.at_ms;
        clock.set_offset(std::time::Duration::from_millis(at_ms));
        driver.tick()?;
        flush(&mut driver, at_ms)?;
        apply(&mut driver, step, at_ms)?;
        flush(&mut driver, at_ms)?;
    }

    let Some(session) = driver.session() else {
        eyre::bail!("replay ended without a session");
    };
    emit(
        clock.elapsed_ms(),
        json!({ "event": "summary", "session": session }),
    );
    if let Some(path) = args.save {
        save_session(path, session)?;
    }
    Ok(())
}

fn flush(driver: &mut SessionDriver, at_ms: u64) -> eyre::Result<()> {
    for event in driver.drain_events() {
        emit(at_ms, serde_json::to_value(&event)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inputs_and_skips_comments() {
        let text = r#"
# warm-up
{"at_ms": 0, "say": "start"}
{"at_ms": 10, "say": "mumble", "confidence": 0.3}
{"at_ms": 20, "manual": "complete"}
{"at_ms": 20, "manual": {"answer": "lemon"}}
{"at_ms": 30, "pose": {"position": [0.0, 1.6, 0.0]}}
{"at_ms": 40, "control": "retry_skipped"}
"#;
        let steps = parse_script(text.as_bytes()).unwrap();
        assert_eq!(steps.len(), 6);
        assert!(matches!(steps[1].confidence, Some(c) if (c - 0.3).abs() < 1e-6));
        assert!(matches!(&steps[3].input, Input::Manual(VoiceCommand::Answer(a)) if a == "lemon"));
        assert!(matches!(&steps[4].input, Input::Pose(p) if p.orientation == identity()));
    }

    #[test]
    fn rejects_time_going_backwards() {
        let text = "{\"at_ms\": 50, \"say\": \"start\"}\n{\"at_ms\": 10, \"say\": \"stop\"}\n";
        let err = parse_script(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
