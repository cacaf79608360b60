//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway data dir.

use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "meditera-cli", "--"])
        .args(args)
        .env("MEDITERA_DATA_DIR", data_dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout is not JSON")
}

#[test]
fn test_routine_list() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["routine", "list"]);
    assert_eq!(code, 0, "routine list failed");

    let routine = json(&stdout);
    let exercises = routine["exercises"].as_array().unwrap();
    assert_eq!(exercises.len(), 9);
    assert_eq!(exercises[0]["name"], "Övning 1");
    assert_eq!(exercises[1]["name"], "Övning 3");
}

#[test]
fn test_config_get_and_set() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["config", "get", "workout.rest_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "15");

    let (code, _, _) = run_cli(&dir, &["config", "set", "workout.rest_secs", "5"]);
    assert_eq!(code, 0);

    let (_, stdout, _) = run_cli(&dir, &["config", "get", "workout.rest_secs"]);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["config", "get", "workout.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_account_flow() {
    let dir = TempDir::new().unwrap();

    let (code, stdout, _) = run_cli(
        &dir,
        &["account", "signup", "--email", "anna@example.com", "--password", "hemligt"],
    );
    assert_eq!(code, 0, "signup failed");
    assert_eq!(json(&stdout)["achievement"], "Account Created");

    let (_, stdout, _) = run_cli(&dir, &["account", "status"]);
    assert_eq!(json(&stdout)["is_authenticated"], true);

    let (code, _, _) = run_cli(&dir, &["account", "logout"]);
    assert_eq!(code, 0);

    let (_, stdout, _) = run_cli(&dir, &["account", "status"]);
    assert_eq!(json(&stdout)["is_authenticated"], false);

    let (code, stdout, _) = run_cli(
        &dir,
        &["account", "login", "--email", "ANNA@example.com", "--password", "hemligt"],
    );
    assert_eq!(code, 0, "login failed");
    assert_eq!(json(&stdout)["workout_count"], 0);
}

#[test]
fn test_login_wrong_password_fails() {
    let dir = TempDir::new().unwrap();
    let _ = run_cli(
        &dir,
        &["account", "signup", "--email", "bo@example.com", "--password", "hemligt"],
    );
    let _ = run_cli(&dir, &["account", "logout"]);

    let (code, _, stderr) = run_cli(
        &dir,
        &["account", "login", "--email", "bo@example.com", "--password", "fel-lösen"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_progress_requires_sign_in() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&dir, &["progress", "show"]);
    assert_eq!(code, 1);
}

#[test]
fn test_workout_records_progress() {
    let dir = TempDir::new().unwrap();
    let _ = run_cli(
        &dir,
        &["account", "signup", "--email", "cia@example.com", "--password", "hemligt"],
    );

    let (code, stdout, _) = run_cli(
        &dir,
        &[
            "workout", "start", "--exercise-secs", "1", "--rest-secs", "0", "--tick-ms", "10",
        ],
    );
    assert_eq!(code, 0, "workout failed");

    let types: Vec<String> = stdout
        .lines()
        .map(|line| json(line)["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types.first().map(String::as_str), Some("session_started"));
    assert!(types.iter().any(|t| t == "lap_completed"));
    assert!(types.iter().any(|t| t == "session_finished"));
    assert!(types.iter().any(|t| t == "workout_recorded"));

    let (code, stdout, _) = run_cli(&dir, &["progress", "show"]);
    assert_eq!(code, 0);
    let progress = json(&stdout);
    assert_eq!(progress["workout_count"], 1);
    let names: Vec<&str> = progress["achievements"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Account Created", "First Workout"]);
}

#[test]
fn test_workout_without_account_is_not_recorded() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(
        &dir,
        &[
            "workout", "start", "--exercise-secs", "1", "--rest-secs", "0", "--tick-ms", "10",
        ],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("session_finished"));
    assert!(!stdout.contains("workout_recorded"));
}

#[test]
fn test_workout_rejects_zero_exercise() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["workout", "start", "--exercise-secs", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&dir, &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("meditera"));
}
