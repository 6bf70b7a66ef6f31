//! Human-readable error descriptions and structured JSON error formatting.

use sideline_core::error::{AssessError, BuildError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Empty word or digit lists, thresholds out of order, or a zero timer.\nHow to fix: Edit the config file, then rerun `sideline check-config`."
        );
    }

    if let Some(ae) = err.downcast_ref::<AssessError>() {
        return match ae {
            AssessError::InvalidStateTransition(msg) => format!(
                "What happened: The session refused the request ({msg}).\nLikely causes: A module is still running, or the session was already finished or abandoned.\nHow to fix: Finish or exit the active module first, or start a new session."
            ),
            AssessError::SensorUnavailable => "What happened: Pose tracking is unavailable.\nLikely causes: The tracking source stopped delivering samples.\nHow to fix: Check the tracking device, or raise sampler.stall_ms in the config.".to_string(),
            AssessError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `sideline check-config`."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config file") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config pointing at a readable TOML file (see etc/sideline.toml)."
        );
    }

    if lower.contains("parse config toml") || lower.contains("invalid configuration") {
        let cause = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid or incomplete{cause}.\nLikely causes: A typo in a section name, a wrong value type, or an out-of-range value.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Vocabulary CSV header special-case
    if lower.contains("vocabulary csv must have headers") {
        return "Invalid headers in vocabulary CSV. Expected 'module,command,alias'.".to_string();
    }

    if lower.contains("replay script") {
        let cause = err
            .chain()
            .nth(1)
            .map(|c| format!(" Cause: {c}"))
            .unwrap_or_default();
        return format!(
            "What happened: {msg}.{cause}\nHow to fix: Each line must be a JSON object such as {{\"at_ms\": 0, \"say\": \"start\"}}."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for configuration problems, 4 for refused session
/// requests, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<AssessError>() {
        Some(AssessError::Config(_)) => 3,
        Some(AssessError::InvalidStateTransition(_)) => 4,
        _ => {
            let lower = err.to_string().to_ascii_lowercase();
            if lower.contains("invalid configuration") || lower.contains("parse config toml") {
                3
            } else {
                1
            }
        }
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<AssessError>() {
        Some(AssessError::InvalidStateTransition(_)) => "InvalidStateTransition",
        Some(AssessError::SensorUnavailable) => "SensorUnavailable",
        Some(AssessError::Config(_)) => "InvalidConfig",
        Some(_) => "Assessment",
        None if exit_code_for_error(err) == 3 => "InvalidConfig",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_maps_to_config_exit_code() {
        let err = eyre::Report::new(BuildError::InvalidConfig("stances must not be empty"));
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("stances must not be empty"));
    }

    #[test]
    fn refused_transition_is_reported_in_json() {
        let err = eyre::Report::new(AssessError::transition("module already active"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "InvalidStateTransition");
        assert_eq!(v["exit_code"], 4);
    }

    #[test]
    fn wrapped_toml_error_is_humanized() {
        let err = eyre::eyre!("expected a table").wrap_err("parse config TOML");
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("expected a table"));
    }
}
