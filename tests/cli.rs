//! Integration tests for top-level CLI behavior.

use std::path::Path;
use std::process::Command;

/// Runs the binary with an isolated history and an unreachable model server.
fn run_tidyscan(state: &Path, args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_tidyscan");
    Command::new(bin)
        .current_dir(state)
        .args(args)
        .arg("--db")
        .arg(state.join("history.db"))
        .args(["--ollama-url", "http://127.0.0.1:9", "--timeout-secs", "2"])
        .env_remove("TIDYSCAN_RECORD")
        .env_remove("TIDYSCAN_DB")
        .output()
        .expect("failed to run tidyscan binary")
}

#[test]
fn help_lists_commands() {
    let state = tempfile::tempdir().unwrap();
    let output = run_tidyscan(state.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    for command in ["scan", "watch", "history", "stats", "trend", "export", "reconcile", "standards"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn unknown_subcommand_fails() {
    let state = tempfile::tempdir().unwrap();
    let output = run_tidyscan(state.path(), &["tidy-up"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unrecognized subcommand"));
}

#[test]
fn empty_history_commands_succeed() {
    let state = tempfile::tempdir().unwrap();

    let history = run_tidyscan(state.path(), &["history"]);
    assert!(history.status.success());
    assert!(String::from_utf8_lossy(&history.stdout).contains("No scans recorded yet."));

    let stats = run_tidyscan(state.path(), &["stats"]);
    assert!(stats.status.success());
    assert!(String::from_utf8_lossy(&stats.stdout).contains("No scans recorded yet."));

    let export = run_tidyscan(state.path(), &["export", "1"]);
    assert!(!export.status.success());
    assert!(String::from_utf8_lossy(&export.stderr).contains("history entry 1 not found"));
}

#[test]
fn standards_are_written_once() {
    let state = tempfile::tempdir().unwrap();

    let first = run_tidyscan(state.path(), &["standards"]);
    assert!(first.status.success());
    let written = std::fs::read_to_string(state.path().join("tidyscan.yaml")).unwrap();
    assert!(written.contains("forbidden_patterns"));

    let second = run_tidyscan(state.path(), &["standards"]);
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));

    assert!(run_tidyscan(state.path(), &["standards", "--force"]).status.success());
}

#[test]
fn scan_without_model_server_falls_back_and_is_recorded() {
    let state = tempfile::tempdir().unwrap();
    let tree = state.path().join("tree");
    std::fs::create_dir_all(tree.join("src")).unwrap();
    std::fs::write(tree.join("Copy of plan.txt"), b"x").unwrap();
    std::fs::write(tree.join("src").join("main.rs"), b"fn main() {}").unwrap();

    let scan = run_tidyscan(state.path(), &["scan", tree.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&scan.stdout);
    assert!(scan.status.success(), "stderr: {}", String::from_utf8_lossy(&scan.stderr));
    assert!(stdout.contains("Messiness score:"));
    assert!(stdout.contains("Degraded: retrieval degraded"));
    assert!(stdout.contains("Degraded: generation degraded"));
    assert!(stdout.contains("Verdict:"));

    let history = run_tidyscan(state.path(), &["history"]);
    let stdout = String::from_utf8_lossy(&history.stdout);
    assert!(stdout.lines().any(|line| line.trim_start().starts_with("1 ")));

    let export_path = state.path().join("out.json");
    let export = run_tidyscan(state.path(), &["export", "1", "-o", export_path.to_str().unwrap()]);
    assert!(export.status.success());
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(document["entry"]["id"], 1);
    assert_eq!(document["statistics"]["total_scans"], 1);
}

#[test]
fn trend_rejects_out_of_range_days() {
    let state = tempfile::tempdir().unwrap();

    let output = run_tidyscan(state.path(), &["trend", "--days", "9000000000000"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--days"));

    let output = run_tidyscan(state.path(), &["trend", "--days", "36500"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No scans in the last 36500 days."));
}
