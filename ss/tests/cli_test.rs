//! CLI tests for the `ss` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `ss` isolated from the user's config and log directories
fn ss(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ss").expect("ss binary");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("NO_COLOR", "1");
    cmd
}

// =============================================================================
// Directory commands
// =============================================================================

#[test]
fn test_users_lists_directory() {
    let home = TempDir::new().unwrap();
    ss(&home)
        .arg("users")
        .assert()
        .success()
        .stdout(predicate::str::contains("Upasana"))
        .stdout(predicate::str::contains("Backend Lead"))
        .stdout(predicate::str::contains("Roshan"));
}

#[test]
fn test_users_json() {
    let home = TempDir::new().unwrap();
    let output = ss(&home).args(["users", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let users: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(users.as_array().map(Vec::len), Some(3));
    assert_eq!(users[2]["bio"], "ML Enthusiast");
}

#[test]
fn test_search_shows_final_matches() {
    let home = TempDir::new().unwrap();
    ss(&home)
        .args(["search", "ro"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Roshni, Roshan]"))
        .stdout(predicate::str::contains("Scheduler stats"));
}

// =============================================================================
// Demo
// =============================================================================

#[test]
fn test_demo_json_lines() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join(".slotsched.yml"),
        "demo:\n  slow-items: 20\n  item-cost-us: 10\n  keystroke-delay-ms: 1\n  toggles: 2\n",
    )
    .unwrap();

    let output = ss(&home).args(["demo", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let summary = lines.last().unwrap();
    assert_eq!(summary["stats"]["urgent-applied"], 2);
    assert_eq!(summary["outcomes"][0]["outcome"], "applied");

    let toggles = lines
        .iter()
        .filter(|l| l["slot"] == "toggle" && l["status"] == "applied")
        .count();
    assert_eq!(toggles, 2);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_prints_defaults() {
    let home = TempDir::new().unwrap();
    ss(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("channel-buffer: 256"))
        .stdout(predicate::str::contains("slow-items: 250"));
}

#[test]
fn test_config_explicit_path() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.yml");
    std::fs::write(&path, "scheduler:\n  channel-buffer: 8\n").unwrap();

    ss(&home)
        .args(["--config", path.to_str().unwrap(), "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("channel-buffer: 8"));
}

#[test]
fn test_config_rejects_zero_buffer() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("bad.yml");
    std::fs::write(&path, "scheduler:\n  channel-buffer: 0\n").unwrap();

    ss(&home)
        .args(["-c", path.to_str().unwrap(), "users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("channel-buffer"));
}

#[test]
fn test_unknown_command_fails() {
    let home = TempDir::new().unwrap();
    ss(&home).arg("bogus").assert().failure();
}
