//! Precedence resolution for configuration.
//!
//! ## Config Precedence (highest to lowest)
//!
//! 1. CLI flags (`--config key=value`, passed at runtime)
//! 2. Session config.kdl (`<data-dir>/config.kdl`)
//! 3. System config.kdl (`$CORK_CONFIG_DIR/config.kdl` or `~/.config/corkboard/config.kdl`)
//! 4. Built-in defaults

use std::time::Duration;

use serde::Serialize;

use crate::canvas::{GestureConfig, ScaleBounds};
use crate::config::schema::*;
use crate::mentions::MentionConfig;
use crate::storage::Storage;
use crate::{Error, Result};

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Take the first layer that sets a value.
fn pick<T: Copy>(cli: Option<T>, session: Option<T>, system: Option<T>, default: T) -> Resolved<T> {
    if let Some(v) = cli {
        Resolved::new(v, ValueSource::CliFlag)
    } else if let Some(v) = session {
        Resolved::new(v, ValueSource::Session)
    } else if let Some(v) = system {
        Resolved::new(v, ValueSource::System)
    } else {
        Resolved::new(default, ValueSource::Default)
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub min_scale: Resolved<f64>,
    pub max_scale: Resolved<f64>,
    pub wheel_zoom_step: Resolved<f64>,
    pub autosave_delay_ms: Resolved<u64>,
    pub mention_limit: Resolved<usize>,
    pub click_jitter_px: Resolved<f64>,
    pub popup_margin_px: Resolved<f64>,
    pub blur_grace_ms: Resolved<u64>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::layer(
            &CorkConfig::default(),
            &CorkConfig::default(),
            &CorkConfig::default(),
        )
    }
}

impl ResolvedConfig {
    fn layer(cli: &CorkConfig, session: &CorkConfig, system: &CorkConfig) -> Self {
        Self {
            min_scale: pick(cli.min_scale, session.min_scale, system.min_scale, DEFAULT_MIN_SCALE),
            max_scale: pick(cli.max_scale, session.max_scale, system.max_scale, DEFAULT_MAX_SCALE),
            wheel_zoom_step: pick(
                cli.wheel_zoom_step,
                session.wheel_zoom_step,
                system.wheel_zoom_step,
                DEFAULT_WHEEL_ZOOM_STEP,
            ),
            autosave_delay_ms: pick(
                cli.autosave_delay_ms,
                session.autosave_delay_ms,
                system.autosave_delay_ms,
                DEFAULT_AUTOSAVE_DELAY_MS,
            ),
            mention_limit: pick(
                cli.mention_limit,
                session.mention_limit,
                system.mention_limit,
                DEFAULT_MENTION_LIMIT,
            ),
            click_jitter_px: pick(
                cli.click_jitter_px,
                session.click_jitter_px,
                system.click_jitter_px,
                DEFAULT_CLICK_JITTER_PX,
            ),
            popup_margin_px: pick(
                cli.popup_margin_px,
                session.popup_margin_px,
                system.popup_margin_px,
                DEFAULT_POPUP_MARGIN_PX,
            ),
            blur_grace_ms: pick(
                cli.blur_grace_ms,
                session.blur_grace_ms,
                system.blur_grace_ms,
                DEFAULT_BLUR_GRACE_MS,
            ),
        }
    }

    /// The effective values as a flat config, for validation and display.
    pub fn effective(&self) -> CorkConfig {
        CorkConfig {
            min_scale: Some(self.min_scale.value),
            max_scale: Some(self.max_scale.value),
            wheel_zoom_step: Some(self.wheel_zoom_step.value),
            autosave_delay_ms: Some(self.autosave_delay_ms.value),
            mention_limit: Some(self.mention_limit.value),
            click_jitter_px: Some(self.click_jitter_px.value),
            popup_margin_px: Some(self.popup_margin_px.value),
            blur_grace_ms: Some(self.blur_grace_ms.value),
        }
    }

    pub fn scale_bounds(&self) -> Result<ScaleBounds> {
        ScaleBounds::new(self.min_scale.value, self.max_scale.value)
    }

    pub fn gesture_config(&self) -> Result<GestureConfig> {
        Ok(GestureConfig {
            scale_bounds: self.scale_bounds()?,
            click_jitter: self.click_jitter_px.value,
            wheel_zoom_step: self.wheel_zoom_step.value,
        })
    }

    pub fn mention_config(&self) -> MentionConfig {
        MentionConfig {
            limit: self.mention_limit.value,
            popup_margin: self.popup_margin_px.value,
            blur_grace: Duration::from_millis(self.blur_grace_ms.value),
        }
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms.value)
    }

    /// `(key, value, source)` for every setting, in file order.
    pub fn entries(&self) -> Vec<(&'static str, String, ValueSource)> {
        let rows = [
            (self.min_scale.value.to_string(), self.min_scale.source),
            (self.max_scale.value.to_string(), self.max_scale.source),
            (self.wheel_zoom_step.value.to_string(), self.wheel_zoom_step.source),
            (self.autosave_delay_ms.value.to_string(), self.autosave_delay_ms.source),
            (self.mention_limit.value.to_string(), self.mention_limit.source),
            (self.click_jitter_px.value.to_string(), self.click_jitter_px.source),
            (self.popup_margin_px.value.to_string(), self.popup_margin_px.source),
            (self.blur_grace_ms.value.to_string(), self.blur_grace_ms.source),
        ];
        CONFIG_KEYS
            .iter()
            .zip(rows)
            .map(|(key, (value, source))| (*key, value, source))
            .collect()
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub config: CorkConfig,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a `key=value` assignment using the config.kdl key names.
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected key=value, got '{}'", assignment)))?;
        let key = key.trim();
        let raw = raw.trim();
        let bad = || Error::Config(format!("invalid value for {}: '{}'", key, raw));
        let float = || raw.parse::<f64>().map_err(|_| bad());
        let int = || raw.parse::<u64>().map_err(|_| bad());

        let c = &mut self.config;
        match key {
            "min-scale" => c.min_scale = Some(float()?),
            "max-scale" => c.max_scale = Some(float()?),
            "wheel-zoom-step" => c.wheel_zoom_step = Some(float()?),
            "autosave-delay-ms" => c.autosave_delay_ms = Some(int()?),
            "mention-limit" => c.mention_limit = Some(int()? as usize),
            "click-jitter-px" => c.click_jitter_px = Some(float()?),
            "popup-margin-px" => c.popup_margin_px = Some(float()?),
            "blur-grace-ms" => c.blur_grace_ms = Some(int()?),
            _ => {
                return Err(Error::Config(format!(
                    "unknown config key '{}' (expected one of: {})",
                    key,
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Builder-style `set`.
    pub fn with(mut self, assignment: &str) -> Result<Self> {
        self.set(assignment)?;
        Ok(self)
    }
}

/// Resolve configuration with full precedence chain.
///
/// Precedence (highest to lowest):
/// 1. CLI flags (from `overrides`)
/// 2. Session config.kdl
/// 3. System config.kdl
/// 4. Built-in defaults
///
/// The effective result is validated as a whole, so a session `min-scale`
/// above a system `max-scale` is rejected.
pub fn resolve_config(storage: &Storage, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = Storage::read_system_cork_config()?;
    let session_config = storage.read_cork_config()?;
    resolve_layers(&overrides.config, &session_config, &system_config)
}

/// Resolve without a data directory (system config and CLI flags only).
pub fn resolve_config_without_storage(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = Storage::read_system_cork_config()?;
    resolve_layers(&overrides.config, &CorkConfig::default(), &system_config)
}

fn resolve_layers(
    cli: &CorkConfig,
    session: &CorkConfig,
    system: &CorkConfig,
) -> Result<ResolvedConfig> {
    let resolved = ResolvedConfig::layer(cli, session, system);
    resolved.effective().validate().map_err(Error::Config)?;
    Ok(resolved)
}
