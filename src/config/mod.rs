//! Configuration for Corkboard.
//!
//! ## config.kdl - Engine tunables
//!
//! Located at:
//! - System: `~/.config/corkboard/config.kdl` (or `$CORK_CONFIG_DIR/config.kdl`)
//! - Session: `<data-dir>/config.kdl`
//!
//! Contains zoom bounds, wheel step, autosave delay, mention limit, click
//! jitter, popup margin and blur grace. See [`schema::CorkConfig`].
//!
//! ## Precedence
//!
//! CLI flag > session config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_config_without_storage,
};
pub use schema::{CONFIG_KEYS, CorkConfig};
