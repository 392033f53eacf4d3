//! Tests for the `terra` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HANDLERS: &str = r#"
[[handlers]]
action = "REQUEST_APPROVED"
handler = "UpdateExpiryDate"
priority = 5
settings = { DAYS = 10, CONDITION = "status == 'approved'" }

[[handlers]]
action = "REQUEST_APPROVED"
handler = "SendEmail"
priority = 20
settings = { RECIPIENT_EMAILS = "[user_email]", SUBJECT_TPL = "Request {{instance_id}} approved" }

[[handlers]]
action = "LAYER_EXPIRED"
handler = "legacy.handlers.Fax"
"#;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
    records: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let handlers = dir.path().join("handlers.toml");
        let records = dir.path().join("records.json");
        let config = dir.path().join("terra.toml");

        fs::write(&handlers, HANDLERS).unwrap();
        fs::write(
            &records,
            r#"{"request:42": {"expiry_date": "2024-02-20"}}"#,
        )
        .unwrap();
        fs::write(
            &config,
            format!(
                "[mail]\nbackend = \"memory\"\n\n[events]\nhandlers_file = '{}'\nrecords_file = '{}'\n",
                handlers.display(),
                records.display()
            ),
        )
        .unwrap();

        Self {
            dir,
            config,
            records,
        }
    }

    fn terra(&self) -> Command {
        terra_in(self.dir.path(), Some(&self.config))
    }
}

fn terra_in(dir: &Path, config: Option<&Path>) -> Command {
    let mut cmd = Command::cargo_bin("terra").unwrap();
    cmd.current_dir(dir)
        .env_remove("TERRA_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    if let Some(config) = config {
        cmd.arg("--config").arg(config);
    }
    cmd
}

// ============================================================================
// send-event
// ============================================================================

#[test]
fn test_send_event_requires_action() {
    let temp = TempDir::new().unwrap();

    terra_in(temp.path(), None)
        .args(["send-event", "--kwargs", "foo:bar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing argument: action"));
}

#[test]
fn test_send_event_rejects_malformed_kwargs() {
    let temp = TempDir::new().unwrap();

    terra_in(temp.path(), None)
        .args(["send-event", "--action", "FAKE", "--kwargs=lorem:ipsum:dolor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly one ':'"));
}

#[test]
fn test_send_event_without_handlers() {
    let temp = TempDir::new().unwrap();

    terra_in(temp.path(), None)
        .args(["send-event", "--kwargs", "action:FAKE", "--kwargs", "foo:bar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dispatched FAKE"))
        .stdout(predicate::str::contains("no handlers configured"));
}

#[test]
fn test_send_event_runs_configured_handlers() {
    let ws = Workspace::new();

    ws.terra()
        .args([
            "send-event",
            "--action",
            "REQUEST_APPROVED",
            "--instance",
            "request:42",
            "--user",
            "ada@example.com",
            "--kwargs",
            "status:approved",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("UpdateExpiryDate"))
        .stdout(predicate::str::contains("SendEmail"))
        .stdout(predicate::str::contains("1 message(s) captured"));

    let records = fs::read_to_string(&ws.records).unwrap();
    assert!(records.contains("2024-03-01"));
}

#[test]
fn test_send_event_skips_false_condition() {
    let ws = Workspace::new();

    let output = ws
        .terra()
        .args([
            "send-event",
            "--action",
            "REQUEST_APPROVED",
            "--instance",
            "request:42",
            "--user",
            "ada@example.com",
            "--kwargs",
            "status:rejected",
            "--json",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["action"], "REQUEST_APPROVED");
    assert_eq!(report["skipped"][0], "UpdateExpiryDate");
    assert_eq!(report["executed"][0], "SendEmail");

    let records = fs::read_to_string(&ws.records).unwrap();
    assert!(records.contains("2024-02-20"));
}

#[test]
fn test_send_event_reports_unresolved_handler() {
    let ws = Workspace::new();

    ws.terra()
        .args(["send-event", "--action", "LAYER_EXPIRED"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unresolved legacy.handlers.Fax"));
}

#[test]
fn test_send_event_fails_when_handler_fails() {
    let ws = Workspace::new();

    // UpdateExpiryDate needs an instance
    ws.terra()
        .args([
            "send-event",
            "--action",
            "REQUEST_APPROVED",
            "--kwargs",
            "status:approved",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dispatch error"));
}

// ============================================================================
// handlers
// ============================================================================

#[test]
fn test_handlers_lists_rows_in_priority_order() {
    let ws = Workspace::new();

    let output = ws
        .terra()
        .args(["handlers", "--action", "REQUEST_APPROVED"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let expiry = stdout.find("UpdateExpiryDate").unwrap();
    let email = stdout.find("SendEmail").unwrap();
    assert!(expiry < email);
    assert!(stdout.contains("status == 'approved'"));
    assert!(stdout.contains("2 handler(s)"));
}

#[test]
fn test_handlers_marks_unknown_references() {
    let ws = Workspace::new();

    ws.terra()
        .arg("handlers")
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy.handlers.Fax (unknown)"))
        .stdout(predicate::str::contains("3 handler(s)"));
}

// ============================================================================
// check-condition
// ============================================================================

#[test]
fn test_check_condition() {
    let temp = TempDir::new().unwrap();

    terra_in(temp.path(), None)
        .args([
            "check-condition",
            "status == 'approved' and len(layer) > 2",
            "--kwargs",
            "status:approved",
            "--kwargs",
            "layer:roads",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("True\n"));

    terra_in(temp.path(), None)
        .args(["check-condition", "status == 'approved'", "--kwargs", "status:draft"])
        .assert()
        .success()
        .stdout(predicate::str::diff("False\n"));
}

#[test]
fn test_check_condition_rejects_unknown_function() {
    let temp = TempDir::new().unwrap();

    terra_in(temp.path(), None)
        .args(["check-condition", "__import__('os')"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expression error"));
}

#[test]
fn test_completions() {
    let temp = TempDir::new().unwrap();

    terra_in(temp.path(), None)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("send-event"));
}
