//! Smoke tests for the cork CLI.
//!
//! These tests verify basic CLI functionality:
//! - `cork --version` outputs version info
//! - `cork --help` lists the command groups
//! - errors come out as JSON or as `Error:` text with a failing exit code

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;

/// Get a Command for the cork binary.
fn cork() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cork"))
}

#[test]
fn test_version_flag() {
    cork()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cork"));
}

#[test]
fn test_help_flag() {
    cork()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("card"))
        .stdout(predicate::str::contains("board"))
        .stdout(predicate::str::contains("mention"));
}

#[test]
fn test_no_args_shows_usage() {
    cork()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_init_json() {
    let env = TestEnv::new();
    env.cork()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":true"));
}

#[test]
fn test_init_human_readable() {
    let env = TestEnv::new();
    env.cork()
        .args(["init", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized corkboard"));
}

#[test]
fn test_init_already_initialized() {
    let env = TestEnv::init();
    env.cork()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":false"));
}

#[test]
fn test_uninitialized_error_is_json() {
    let env = TestEnv::new();
    env.cork()
        .args(["card", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("cork init"));
}

#[test]
fn test_uninitialized_error_human() {
    let env = TestEnv::new();
    env.cork()
        .args(["-H", "card", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Not initialized"));
}

#[test]
fn test_data_dir_flag_overrides_env() {
    let env = TestEnv::new();
    let other = tempfile::TempDir::new().unwrap();
    env.cork()
        .arg("--data-dir")
        .arg(other.path())
        .arg("init")
        .assert()
        .success();
    assert!(other.path().join("corkboard.db").exists());
    assert!(!env.data_path().join("corkboard.db").exists());
}
