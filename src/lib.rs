//! Corkboard - spatial card boards with inline mentions and backlinks.
//!
//! This library provides the core functionality for the `cork` CLI tool:
//! the canvas engine (viewport, gestures, card positions), the mention and
//! backlink engine, debounced autosave, and the persistence layer they talk to.

pub mod autosave;
pub mod canvas;
pub mod cli;
pub mod commands;
pub mod config;
pub mod mentions;
pub mod models;
pub mod notices;
pub mod session;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::models::{Card, CardId};
    use crate::storage::Storage;

    /// Test environment with an isolated data directory.
    pub struct TestEnv {
        /// Isolated data storage directory
        pub data_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with an empty data directory.
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init(self.data_path()).unwrap()
        }

        /// Open storage for this test environment.
        pub fn open_storage(&self) -> Storage {
            Storage::open(self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Build a card with fixed ID, title and body.
    pub fn card(id: i64, title: &str, content: &str) -> Card {
        Card::new(CardId(id), title).with_content(content)
    }
}

/// Library-level error type for Corkboard operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] kdl::KdlError),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Not initialized: run `cork init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The persistence collaborator rejected the session; the caller should
    /// send the user back through sign-in. Never retried by the core.
    #[error("Session expired: sign in again")]
    SessionExpired,

    /// A position or text commit failed. Recoverable: optimistic state is kept.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error should be surfaced as a sign-in redirect.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }
}

/// Result type alias for Corkboard operations.
pub type Result<T> = std::result::Result<T, Error>;
