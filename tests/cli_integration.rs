//! Integration tests for the twotone CLI

use assert_cmd::cargo;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;
use twotone::testing::{alpha_frame, blank_frame, omega_frame};

/// Get a Command for the twotone binary
fn twotone() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("twotone"));
    cmd.env_remove("TWOTONE_SENSITIVITY").env_remove("TWOTONE_CONFIG");
    cmd
}

/// Settings path inside `temp` that does not exist yet
fn settings_path(temp: &TempDir) -> PathBuf {
    temp.path().join("settings.json")
}

fn write_frame(temp: &TempDir, frame: &image::RgbaImage) -> PathBuf {
    let path = temp.path().join("frame.png");
    frame.save(&path).unwrap();
    path
}

#[test]
fn test_help() {
    twotone()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Track binary outcomes"));
}

#[test]
fn test_version() {
    twotone()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

// =========================================================================
// Replay
// =========================================================================

#[test]
fn test_replay_golden_sequence() {
    let temp = TempDir::new().unwrap();
    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["replay", "AAOAO"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 outcomes"))
        .stdout(predicate::str::contains("Frequency Majority"))
        .stdout(predicate::str::contains("(best)"))
        .stdout(predicate::str::contains("50.0%"))
        .stdout(predicate::str::contains("Recent: AAOAO"))
        .stdout(predicate::str::contains("next: omega"));
}

#[test]
fn test_replay_json() {
    let temp = TempDir::new().unwrap();
    let output = twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["replay", "alpha,alpha,omega,alpha,omega", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["history"].as_array().unwrap().len(), 5);
    assert_eq!(snapshot["bestMethod"], "Recent Window");
    assert_eq!(snapshot["methods"][0]["predictions"], 4);
    assert_eq!(snapshot["methods"][0]["correct"], 2);
    assert_eq!(snapshot["methods"][3]["correct"], 1);
    assert_eq!(snapshot["methods"][1]["accuracyPercent"], 75.0);
    assert_eq!(snapshot["bestForecast"], "omega");
    assert_eq!(snapshot["stats"]["alpha"], 3);
}

#[test]
fn test_replay_rejects_unknown_symbol() {
    let temp = TempDir::new().unwrap();
    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["replay", "AAXO"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown outcome"));
}

// =========================================================================
// Classify
// =========================================================================

#[test]
fn test_classify_detects_alpha() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &alpha_frame(200, 120));

    let output = twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .args(["--region", "0,0,200,120", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["detected"], "alpha");
    assert_eq!(result["leftBlue"], 1.0);
    assert_eq!(result["sensitivity"], 30);
}

#[test]
fn test_classify_detects_omega_text() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &omega_frame(200, 120));

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .args(["--region", "0,0,200,120", "--sensitivity", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("omega"));
}

#[test]
fn test_classify_blank_detects_nothing() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &blank_frame(200, 120));

    let output = twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .args(["--region", "0,0,200,120", "--json"])
        .output()
        .unwrap();
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(result["detected"].is_null());
}

#[test]
fn test_classify_uses_region_from_settings() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &omega_frame(200, 120));
    std::fs::write(
        settings_path(&temp),
        r#"{ "sensitivity": 40, "region": { "x": 0, "y": 0, "width": 200, "height": 120 } }"#,
    )
    .unwrap();

    let output = twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["detected"], "omega");
    assert_eq!(result["sensitivity"], 40);
}

#[test]
fn test_classify_rejects_small_region() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &alpha_frame(200, 120));

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .args(["--region", "0,0,50,120"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("must exceed 50"));
}

#[test]
fn test_classify_rejects_off_step_sensitivity() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &alpha_frame(200, 120));

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .args(["--region", "0,0,200,120", "--sensitivity", "33"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid sensitivity 33"));
}

#[test]
fn test_classify_sensitivity_from_env() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &alpha_frame(200, 120));

    twotone()
        .env("TWOTONE_SENSITIVITY", "7")
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .args(["--region", "0,0,200,120"])
        .assert()
        .code(2);
}

#[test]
fn test_classify_missing_image_is_unavailable() {
    let temp = TempDir::new().unwrap();

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(temp.path().join("missing.png"))
        .args(["--region", "0,0,200,120"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Capture unavailable"));
}

#[test]
fn test_classify_without_region_is_config_error() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &alpha_frame(200, 120));

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("classify")
        .arg(&frame)
        .assert()
        .code(7)
        .stderr(predicate::str::contains("region"));
}

// =========================================================================
// Monitor
// =========================================================================

#[test]
fn test_monitor_manual_outcome_then_stop() {
    let temp = TempDir::new().unwrap();
    let frame = write_frame(&temp, &blank_frame(200, 120));

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("monitor")
        .arg(&frame)
        .args(["--region", "0,0,200,120"])
        .write_stdin("a\nstop\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 outcomes"))
        .stdout(predicate::str::contains("Alpha: 1"));
}

#[test]
fn test_monitor_missing_image_fails_to_start() {
    let temp = TempDir::new().unwrap();

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .arg("monitor")
        .arg(temp.path().join("missing.png"))
        .args(["--region", "0,0,200,120"])
        .write_stdin("")
        .assert()
        .code(3);
}

// =========================================================================
// Config
// =========================================================================

#[test]
fn test_config_path_respects_flag() {
    let temp = TempDir::new().unwrap();
    let path = settings_path(&temp);

    twotone()
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings.json"));
}

#[test]
fn test_config_show_defaults() {
    let temp = TempDir::new().unwrap();

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sensitivity\": 30"))
        .stdout(predicate::str::contains("captureTimeoutMs"));
}

#[test]
fn test_config_validate_ok() {
    let temp = TempDir::new().unwrap();
    std::fs::write(settings_path(&temp), r#"{ "sensitivity": 25 }"#).unwrap();

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_config_validate_rejects_bad_sensitivity() {
    let temp = TempDir::new().unwrap();
    std::fs::write(settings_path(&temp), r#"{ "sensitivity": 60 }"#).unwrap();

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["config", "validate"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Invalid sensitivity 60"));
}

#[test]
fn test_config_from_env() {
    let temp = TempDir::new().unwrap();
    std::fs::write(settings_path(&temp), r#"{ "sensitivity": 45 }"#).unwrap();

    twotone()
        .env("TWOTONE_CONFIG", settings_path(&temp))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sensitivity\": 45"));
}

#[test]
fn test_config_malformed_file() {
    let temp = TempDir::new().unwrap();
    std::fs::write(settings_path(&temp), "{ not json").unwrap();

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["config", "show"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_config_init_writes_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("settings.json");

    twotone()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"sensitivity\": 30"));
    assert!(content.contains("captureTimeoutMs"));
}

#[test]
fn test_config_init_keeps_existing_file() {
    let temp = TempDir::new().unwrap();
    std::fs::write(settings_path(&temp), r#"{ "sensitivity": 45 }"#).unwrap();

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["config", "init"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("already exists"));
    assert!(std::fs::read_to_string(settings_path(&temp))
        .unwrap()
        .contains("45"));

    twotone()
        .arg("--config")
        .arg(settings_path(&temp))
        .args(["config", "init", "--force"])
        .assert()
        .success();
    assert!(std::fs::read_to_string(settings_path(&temp))
        .unwrap()
        .contains("\"sensitivity\": 30"));
}
