//! Common test utilities for corkboard integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/corkboard/` or `~/.config/corkboard/`.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
pub use tempfile::TempDir;

/// A test environment with isolated data and config directories.
///
/// The `cork()` method returns a `Command` that sets `CORK_DATA_DIR` and
/// `CORK_CONFIG_DIR` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `cork init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.cork().arg("init").assert().success();
        env
    }

    /// Get a Command for the cork binary with isolated directories.
    pub fn cork(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cork"));
        cmd.env("CORK_DATA_DIR", self.data_dir.path());
        cmd.env("CORK_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("CORK_LOG");
        cmd
    }

    /// Run a command expected to succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.cork().args(args).assert().success().get_output().clone();
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Create a card and return its ID.
    pub fn create_card(&self, title: &str, content: &str) -> i64 {
        let value = self.json(&["card", "create", title, "--content", content]);
        value["id"].as_i64().unwrap()
    }

    /// Create a board and return its ID.
    pub fn create_board(&self, name: &str) -> i64 {
        let value = self.json(&["board", "create", name]);
        value["id"].as_i64().unwrap()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Get the path to the system config directory.
    pub fn config_path(&self) -> &std::path::Path {
        self.config_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
