//! Smoke tests for the vigil CLI
//!
//! Only commands that need no browser are exercised here.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the vigil binary with env overrides cleared
fn vigil() -> Command {
    let mut cmd = Command::cargo_bin("vigil").expect("vigil binary should exist");
    for key in [
        "SELENIUM_BROWSER",
        "VIGIL_EXTENSION_PATH",
        "VIGIL_ARTIFACT_DIR",
        "CHROMIUM_PATH",
        "VIGIL_NO_SANDBOX",
        "VIGIL_TOKEN_ADDRESS",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    vigil()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    vigil()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("locators"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_no_args_fails() {
    vigil().assert().failure();
}

#[test]
fn test_wait_without_target_fails() {
    vigil()
        .args(["wait", "about:blank"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name"));
}

// ============================================================================
// Locators
// ============================================================================

#[test]
fn test_locators_table_filtered() {
    vigil()
        .args(["locators", "--filter", "screens.lock", "--color", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("screens.lock.fieldPassword"))
        .stdout(predicate::str::contains("password-box"))
        .stdout(predicate::str::contains("screens.main").not());
}

#[test]
fn test_locators_json() {
    let output = vigil()
        .args(["locators", "--format", "json", "--filter", "elements."])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert!(!rows.is_empty());
    assert!(rows
        .iter()
        .all(|r| r["name"].as_str().unwrap().starts_with("elements.")));
}

#[test]
fn test_locators_with_texts() {
    vigil()
        .args(["locators", "--filter", "screens.lock", "--texts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Incorrect password. Try again."));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_defaults() {
    vigil()
        .args(["config", "--no-env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("browser: chrome"))
        .stdout(predicate::str::contains("appear_attempts: 200"))
        .stdout(predicate::str::contains("disappear_attempts: 10"))
        .stdout(predicate::str::contains("no_sandbox: false"));
}

#[test]
fn test_config_no_sandbox_env() {
    vigil()
        .args(["config"])
        .env("VIGIL_NO_SANDBOX", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("no_sandbox: true"));
}

#[test]
fn test_config_env_override() {
    vigil()
        .args(["config"])
        .env("SELENIUM_BROWSER", "firefox")
        .assert()
        .success()
        .stdout(predicate::str::contains("browser: firefox"));
}

#[test]
fn test_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vigil.yaml");
    fs::write(&path, "headless: true\npoll:\n  interval_ms: 250\n").unwrap();

    vigil()
        .args(["config", "--no-env", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("headless: true"))
        .stdout(predicate::str::contains("interval_ms: 250"));
}

#[test]
fn test_config_rejects_zero_interval() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vigil.yaml");
    fs::write(&path, "poll:\n  interval_ms: 0\n").unwrap();

    vigil()
        .args(["config", "--no-env", "--path"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval_ms"));
}

#[test]
fn test_config_unknown_browser_env() {
    vigil()
        .args(["config"])
        .env("SELENIUM_BROWSER", "netscape")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported browser"));
}
