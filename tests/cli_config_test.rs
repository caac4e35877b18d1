//! Integration tests for configuration resolution via CLI.
//!
//! These tests verify precedence (CLI flag > data-dir config.kdl > system
//! config.kdl > default), source reporting and validation.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::Value;

fn entry<'a>(show: &'a Value, key: &str) -> &'a Value {
    show["entries"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["key"] == key)
        .unwrap()
}

#[test]
fn test_defaults_before_init() {
    let env = TestEnv::new();
    let show = env.json(&["config", "show"]);
    let max = entry(&show, "max-scale");
    assert_eq!(max["value"], "2.4");
    assert_eq!(max["source"], "default");
    assert_eq!(show["entries"].as_array().unwrap().len(), 8);
}

#[test]
fn test_precedence_chain() {
    let env = TestEnv::init();
    std::fs::write(
        env.config_path().join("config.kdl"),
        "autosave-delay-ms 500\nmention-limit 3\nmax-scale 3.0\n",
    )
    .unwrap();
    env.cork()
        .args(["config", "set", "mention-limit=5"])
        .assert()
        .success();

    let show = env.json(&["--config", "max-scale=2.0", "config", "show"]);
    assert_eq!(entry(&show, "autosave-delay-ms")["source"], "system");
    assert_eq!(entry(&show, "autosave-delay-ms")["value"], "500");
    assert_eq!(entry(&show, "mention-limit")["source"], "session");
    assert_eq!(entry(&show, "mention-limit")["value"], "5");
    assert_eq!(entry(&show, "max-scale")["source"], "cli");
    assert_eq!(entry(&show, "min-scale")["source"], "default");
}

#[test]
fn test_set_writes_data_dir_file() {
    let env = TestEnv::init();
    env.cork()
        .args(["config", "set", "blur-grace-ms=300"])
        .assert()
        .success();
    let text = std::fs::read_to_string(env.data_path().join("config.kdl")).unwrap();
    assert!(text.contains("blur-grace-ms 300"));
}

#[test]
fn test_set_rejects_unknown_key() {
    let env = TestEnv::init();
    env.cork()
        .args(["config", "set", "zoom=2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_set_rejects_inverted_bounds() {
    let env = TestEnv::init();
    env.cork()
        .args(["config", "set", "min-scale=5"])
        .assert()
        .failure();
    assert!(!env.data_path().join("config.kdl").exists());
}

#[test]
fn test_invalid_flag_value() {
    let env = TestEnv::init();
    env.cork()
        .args(["--config", "mention-limit=0", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}

#[test]
fn test_human_output() {
    let env = TestEnv::new();
    env.cork()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("autosave-delay-ms"))
        .stdout(predicate::str::contains("(default)"));
}
