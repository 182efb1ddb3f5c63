//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temp dir, so every
//! test sees its own config and outbox. The collector is pointed at a closed
//! local port to exercise the offline paths.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command with `home` as the home directory.
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_selstudy"))
        .args(args)
        .env("HOME", home)
        .env_remove("SELSTUDY_ENV")
        .env("SELSTUDY_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Home dir whose config points at an unreachable collector with fast retries.
fn offline_home() -> TempDir {
    let home = TempDir::new().unwrap();
    for (key, value) in [
        ("collector.base_url", "http://127.0.0.1:9"),
        ("collector.timeout_secs", "1"),
        ("retry.initial_delay_ms", "1"),
    ] {
        let (code, _, stderr) = run_cli(home.path(), &["config", "set", key, value]);
        assert_eq!(code, 0, "config set {key} failed: {stderr}");
    }
    home
}

#[test]
fn test_config_get_default() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "retry.max_retries"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3");
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "set", "collector.timeout_secs", "30"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "collector.timeout_secs"]);
    assert_eq!(stdout.trim(), "30");
    assert!(home.path().join(".config/selstudy/config.toml").exists());
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "nope.nothing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: unknown key"));
}

#[test]
fn test_config_list_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["outbox"]["file_name"], "metrics_outbox.json");
}

#[test]
fn test_tasks_list_arms() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["tasks", "list", "--json"]);
    assert_eq!(code, 0);
    let arm0: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(arm0.as_array().unwrap().len(), 4);
    assert_eq!(arm0[0]["target"], "quick");

    let (_, stdout, _) = run_cli(home.path(), &["tasks", "list", "--arm", "1", "--json"]);
    let arm1: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(arm1[0]["target"], "brown");
    assert_eq!(arm1[0]["method"], "precision");
}

#[test]
fn test_tasks_list_rejects_bad_arm() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(home.path(), &["tasks", "list", "--arm", "3"]);
    assert_eq!(code, 1);
}

#[test]
fn test_session_start_offline() {
    let home = offline_home();
    let (code, stdout, stderr) = run_cli(
        home.path(),
        &["session", "start", "--participant", "P01", "--arm", "1", "--json"],
    );
    assert_eq!(code, 0, "{stderr}");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["offline"], true);
    assert!(parsed["sessionId"].as_str().unwrap().starts_with("local-"));
    assert_eq!(parsed["counterbalanceArm"], 1);
}

#[test]
fn test_session_start_requires_participant() {
    let home = offline_home();
    let (code, _, stderr) = run_cli(home.path(), &["session", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("participant"));
}

#[test]
fn test_outbox_empty_and_replay() {
    let home = offline_home();
    let (code, stdout, _) = run_cli(home.path(), &["outbox", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("0 pending"));

    let (code, stdout, _) = run_cli(home.path(), &["replay"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "attempted 0, delivered 0, remaining 0");
}

#[test]
fn test_run_snap_script() {
    let home = TempDir::new().unwrap();
    let script = home.path().join("events.json");
    std::fs::write(
        &script,
        r#"[{"type":"selection","atMs":0,"start":0,"length":0},
            {"type":"selection","atMs":800,"start":3,"length":6}]"#,
    )
    .unwrap();

    let (code, stdout, stderr) = run_cli(
        home.path(),
        &["run", "--task", "1", "--events", script.to_str().unwrap()],
    );
    assert_eq!(code, 0, "{stderr}");
    assert!(stderr.contains("snapped to"));
    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["completionStatus"], "completed");
    assert_eq!(outcome["finalSelectionStart"], 4);
    assert_eq!(outcome["finalSelectionEnd"], 9);
    assert_eq!(outcome["timeTaken_ms"], 800);
}

#[test]
fn test_run_rejects_bad_arm_and_offset() {
    let home = TempDir::new().unwrap();
    let script = home.path().join("events.json");
    std::fs::write(&script, r#"[{"type":"selection","atMs":100,"start":4,"length":5}]"#).unwrap();
    let events = script.to_str().unwrap();

    let (code, _, stderr) = run_cli(
        home.path(),
        &["run", "--task", "1", "--events", events, "--arm", "5"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("arm must be 0 or 1"));

    std::fs::write(
        &script,
        r#"[{"type":"selection","atMs":9000000000000000000,"start":4,"length":5}]"#,
    )
    .unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["run", "--task", "1", "--events", events]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: event offset"));
}

#[test]
fn test_run_submit_queues_when_offline() {
    let home = offline_home();
    let script = home.path().join("events.json");
    std::fs::write(&script, r#"[{"type":"selection","atMs":100,"start":4,"length":5}]"#).unwrap();

    let (code, _, stderr) = run_cli(
        home.path(),
        &["run", "--task", "1", "--events", script.to_str().unwrap(), "--submit"],
    );
    assert_eq!(code, 0, "{stderr}");
    assert!(stderr.contains("queued in outbox after 4 attempt(s)"));

    let (_, stdout, _) = run_cli(home.path(), &["outbox", "list", "--json"]);
    let entries: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["destinationPath"], "/metrics");
    assert_eq!(entries[0]["payload"]["taskName"], "Task 1");
}

#[test]
fn test_sus_score_and_validation() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["sus", "score", "--responses", "5,1,5,1,5,1,5,1,5,1"],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "100.0");

    let (code, _, stderr) = run_cli(home.path(), &["sus", "score", "--responses", "3,3,3"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("responses"));
}

#[test]
fn test_sus_submit_offline_reports_error() {
    let home = offline_home();
    let (code, _, stderr) = run_cli(
        home.path(),
        &[
            "sus",
            "submit",
            "--session-id",
            "local-abc",
            "--responses",
            "4,2,4,2,4,2,4,2,4,2",
        ],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("Network error"));

    let (_, stdout, _) = run_cli(home.path(), &["outbox", "list", "--json"]);
    let entries: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["destinationPath"], "/sus");
}
