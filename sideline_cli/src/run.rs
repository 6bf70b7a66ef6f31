//! Live session: transcripts from stdin, simulated pose tracking.
//!
//! Every stdin line is a final transcript, except lines starting with `:`
//! which are examiner taps (`:start`, `:add_error`, `:select tandem`,
//! `:answer lemon`, `:gesture on`, `:focus off`, `:retry`, `:resume-session`,
//! `:quit`).

use std::io::BufRead;
use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use serde_json::json;
use sideline_core::mocks::SimulatedPoseSource;
use sideline_core::{
    AssessCfg, DispatchOutcome, Inbound, RuntimeEvent, SamplingMode, SessionDriver, SessionKind,
    SessionRuntime, TranscriptEvent, VoiceCommand,
};

use crate::replay::{load_session, save_session};

const TICK: Duration = Duration::from_millis(20);

fn on_off(arg: &str) -> Option<bool> {
    match arg {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Map one stdin line to a runtime request. `None` for blank or unknown input.
pub fn parse_line(line: &str) -> Option<Inbound> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(tap) = line.strip_prefix(':') else {
        return Some(Inbound::Transcript(TranscriptEvent::final_text(line)));
    };
    let (word, rest) = tap
        .split_once(char::is_whitespace)
        .map_or((tap, ""), |(w, r)| (w, r.trim()));
    let msg = match word {
        "gesture" => Inbound::Gesture(on_off(rest)?),
        "focus" => Inbound::Focus(on_off(rest)?),
        "retry" => Inbound::RetrySkipped,
        "resume-session" => Inbound::Resume,
        "quit" => Inbound::Shutdown,
        "select" if !rest.is_empty() => {
            Inbound::Manual(VoiceCommand::SelectByName(rest.to_lowercase()))
        }
        "answer" if !rest.is_empty() => Inbound::Manual(VoiceCommand::Answer(rest.to_string())),
        other => Inbound::Manual(
            serde_json::from_value(serde_json::Value::String(other.to_lowercase())).ok()?,
        ),
    };
    Some(msg)
}

fn print_event(event: &RuntimeEvent) -> eyre::Result<()> {
    match event {
        RuntimeEvent::Driver(e) => println!("{}", serde_json::to_string(e)?),
        RuntimeEvent::Dispatch(DispatchOutcome::Rejected { command, error }) => println!(
            "{}",
            json!({ "event": "rejected", "command": command.label(), "error": error.to_string() })
        ),
        RuntimeEvent::Dispatch(DispatchOutcome::NoMatch) => {
            println!("{}", json!({ "event": "no_match" }));
        }
        RuntimeEvent::Dispatch(other) => tracing::debug!(outcome = ?other, "dispatch"),
        RuntimeEvent::Error(e) => tracing::warn!(error = %e, "request refused"),
    }
    Ok(())
}

pub fn run_live(
    cfg: AssessCfg,
    kind: SessionKind,
    restore: Option<&Path>,
    save: Option<&Path>,
    event_mode: bool,
) -> eyre::Result<()> {
    let sampler_cfg = cfg.sampler;
    let mut driver = SessionDriver::builder().with_config(cfg).try_build()?;
    if let Some(path) = restore {
        driver.restore(load_session(path)?)?;
    }

    let mode = if event_mode {
        SamplingMode::Event
    } else {
        SamplingMode::Paced(sampler_cfg.sample_rate_hz)
    };
    let runtime = SessionRuntime::spawn(
        driver,
        kind,
        SimulatedPoseSource::default(),
        mode,
        sampler_cfg,
        TICK,
    )?;
    tracing::info!(session = %runtime.session_id(), kind = kind.as_str(), "session running");

    let cancel = runtime.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).wrap_err("install Ctrl-C handler")?;

    let tx = runtime.sender();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                Some(msg) => {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
                None => tracing::warn!(%line, "unrecognized input ignored"),
            }
        }
        // end of input ends the run once queued requests are handled
        let _ = tx.send(Inbound::Shutdown);
    });

    // the channel closes when the worker exits
    for event in runtime.events().iter() {
        print_event(&event)?;
    }

    let Some(session) = runtime.finish() else {
        eyre::bail!("session runtime ended without a session");
    };
    println!(
        "{}",
        json!({
            "event": "summary",
            "status": session.status,
            "progress": session.progress(),
            "completed": session.completed,
        })
    );
    if let Some(path) = save {
        save_session(path, &session)?;
    }
    Ok(())
}
