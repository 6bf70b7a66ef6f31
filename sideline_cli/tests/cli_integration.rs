use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Everything not listed falls back to the built-in clinical defaults
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[session]
concussion = ["months_reverse"]

[recognition]
min_confidence = 0.5
fallback_after = 2
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

const MONTHS: &str =
    "december november october september august july june may april march february january";

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["check-config"], 0, "config ok", "stdout")]
#[case(&["score", "digits", "--presented", "7-2-4", "--response", "four two seven"], 0, "pass", "stdout")]
#[case(&["score", "digits", "--presented", "724", "--response", "7 2 4"], 0, "fail at position 1", "stdout")]
#[case(&["score", "recall", "--words", "apple,ball,cat", "--response", "cat, um, apple, apple"], 0, "2/3 recalled", "stdout")]
#[case(&["score", "months", "--response", MONTHS], 0, "1/1", "stdout")]
#[case(&["score", "digits", "--presented", "abc", "--response", "1"], 1, "no digits", "stderr")]
#[case(&["score"], 2, "Usage", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("sideline").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("2:45 pm", "correct (expected 14:30)")]
#[case("nine in the morning", "incorrect (expected 14:30)")]
fn orientation_time_within_tolerance(#[case] response: &str, #[case] expected: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    Command::cargo_bin("sideline")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["score", "orientation", "--item", "time", "--response", response])
        .args(["--at", "2024-03-15T14:30:00"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(expected));
}

#[test]
fn check_config_json_lists_orders() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let out = Command::cargo_bin("sideline")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("check-config")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["orders"]["concussion"], serde_json::json!(["months_reverse"]));
    assert_eq!(v["orders"]["baseline"].as_array().map(Vec::len), Some(8));
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[timers]\nstance_ms = 0\n").unwrap();

    Command::cargo_bin("sideline")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("check-config")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("stance_ms"));
}

#[test]
fn invalid_config_json_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[recognition]\nmin_confidence = 2.0\n").unwrap();

    let out = Command::cargo_bin("sideline")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--json")
        .arg("check-config")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let line = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "InvalidConfig");
}

#[test]
fn missing_config_file_is_explained() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("sideline")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("check-config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not be read"));
}

#[rstest]
fn cli_reports_bad_vocabulary_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("vocab.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "module,command,word").unwrap();
    writeln!(f, "balance,add_error,wobble").unwrap();

    Command::cargo_bin("sideline")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--vocabulary")
        .arg(&bad_csv)
        .arg("check-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn run_reads_transcripts_from_stdin() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let saved = dir.path().join("session.json");

    // std::process::Command has no stdin helper; assert_cmd's does
    let out = assert_cmd::Command::cargo_bin("sideline")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--kind", "concussion", "--save"])
        .arg(&saved)
        .write_stdin(format!("begin\n{MONTHS}\n:complete\n"))
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(events.iter().any(|e| e["event"] == "session_complete"));
    let summary = events.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert_eq!(summary["status"]["state"], "completed");

    let session: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&saved).unwrap()).unwrap();
    assert_eq!(session["completed"], serde_json::json!(["months_reverse"]));
}
