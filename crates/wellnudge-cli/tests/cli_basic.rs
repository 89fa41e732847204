//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway data
//! directory and verify outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command with `data_dir` as the data directory.
/// Returns (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "wellnudge-cli", "--"])
        .args(args)
        .env("WELLNUDGE_DATA_DIR", data_dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

#[test]
fn test_config_path_is_inside_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["config", "path"]);
    assert!(stdout.trim().ends_with("config.toml"));
    assert!(stdout.contains(&dir.path().display().to_string()));
}

#[test]
fn test_config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "preferences.water.interval_minutes", "25"]);
    let stdout = run_cli_success(dir.path(), &["config", "get", "preferences.water.interval_minutes"]);
    assert_eq!(stdout.trim(), "25");

    let stdout = run_cli_success(dir.path(), &["config", "get", "preferences.work_start"]);
    assert_eq!(stdout.trim(), "08:00");
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "preferences.coffee"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "preferences.work_end", "25:99"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_list_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "preferences.snooze_minutes", "9"]);
    let stdout = run_cli_success(dir.path(), &["config", "list"]);
    assert!(stdout.contains("preferences.snooze_minutes = 9"));

    run_cli_success(dir.path(), &["config", "reset"]);
    let stdout = run_cli_success(dir.path(), &["config", "list", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["preferences"]["snooze_minutes"], 5);
}

#[test]
fn test_plan_json_lists_every_category() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["plan", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let categories = json["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 3);
    assert!(json["work_window"]["start"].is_string());
}

#[test]
fn test_simulate_morning() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(
        dir.path(),
        &["simulate", "--from", "07:59", "--to", "09:00", "--json"],
    );
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let shown = |category: &str| {
        events
            .iter()
            .filter(|e| e["type"] == "ReminderShown" && e["category"] == category)
            .count()
    };

    // Countdowns start at 08:00 and each completion, 30 s after the
    // reminder appears, restarts that category: eye rest at 08:20:00 and
    // 08:40:30, water at 08:30:00, movement at 08:45:00.
    assert_eq!(shown("water"), 1);
    assert_eq!(shown("eye_rest"), 2);
    assert_eq!(shown("movement"), 1);
    assert!(events.iter().any(|e| e["type"] == "ReminderResolved"));
}

#[test]
fn test_log_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(dir.path(), &["log", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["reminders"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["water"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["water_today_ml"], 0);
}

#[test]
fn test_completing_water_logs_a_glass() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "preferences.default_glass_ml", "330"]);

    let mut child = Command::new("cargo")
        .args(["run", "-q", "-p", "wellnudge-cli", "--", "run"])
        .env("WELLNUDGE_DATA_DIR", dir.path())
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .expect("Failed to start daemon");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"test water\ndone\ntest movement\ndone\nquit\n")
        .unwrap();
    assert!(child.wait().unwrap().success());

    let stdout = run_cli_success(dir.path(), &["log", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["reminders"].as_array().map(Vec::len), Some(2));
    let water = json["water"].as_array().unwrap();
    assert_eq!(water.len(), 1);
    assert_eq!(water[0]["amount_ml"], 330);
    assert_eq!(json["water_today_ml"], 330);
}
