//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The `CorkConfig` struct representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation
//! - Default values

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_SCALE: f64 = 0.25;
pub const DEFAULT_MAX_SCALE: f64 = 2.4;
pub const DEFAULT_WHEEL_ZOOM_STEP: f64 = 0.001;
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 800;
pub const DEFAULT_MENTION_LIMIT: usize = 8;
pub const DEFAULT_CLICK_JITTER_PX: f64 = 4.0;
pub const DEFAULT_POPUP_MARGIN_PX: f64 = 8.0;
pub const DEFAULT_BLUR_GRACE_MS: u64 = 150;

/// Engine tunables stored in config.kdl.
///
/// Every field is optional so that partial files can be layered.
///
/// # KDL Schema
///
/// ```kdl
/// min-scale 0.25
/// max-scale 2.4
/// wheel-zoom-step 0.001
/// autosave-delay-ms 800
/// mention-limit 8
/// click-jitter-px 4.0
/// popup-margin-px 8.0
/// blur-grace-ms 150
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorkConfig {
    /// Lower zoom bound
    pub min_scale: Option<f64>,

    /// Upper zoom bound
    pub max_scale: Option<f64>,

    /// Scale change per wheel delta unit
    pub wheel_zoom_step: Option<f64>,

    /// Quiet period before an edit is persisted
    pub autosave_delay_ms: Option<u64>,

    /// Maximum number of mention candidates
    pub mention_limit: Option<usize>,

    /// Screen distance a click may move and still create a card
    pub click_jitter_px: Option<f64>,

    /// Minimum distance between the mention popup and the viewport edge
    pub popup_margin_px: Option<f64>,

    /// Delay between losing focus and closing the mention popup
    pub blur_grace_ms: Option<u64>,
}

/// Names of every recognised key, in file order.
pub const CONFIG_KEYS: [&str; 8] = [
    "min-scale",
    "max-scale",
    "wheel-zoom-step",
    "autosave-delay-ms",
    "mention-limit",
    "click-jitter-px",
    "popup-margin-px",
    "blur-grace-ms",
];

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

/// Floats may be written as integers (`max-scale 2`).
fn as_f64(value: &KdlValue) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn as_u64(value: &KdlValue) -> Option<u64> {
    value.as_integer().and_then(|i| u64::try_from(i).ok())
}

fn float_node(name: &str, value: f64) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::Float(value)));
    node
}

fn integer_node(name: &str, value: u64) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::Integer(value as i128)));
    node
}

impl CorkConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        let min = self.min_scale.unwrap_or(DEFAULT_MIN_SCALE);
        let max = self.max_scale.unwrap_or(DEFAULT_MAX_SCALE);
        if !(min.is_finite() && min > 0.0) {
            return Err(format!("min-scale must be positive, got {}", min));
        }
        if !max.is_finite() || min > max {
            return Err(format!(
                "max-scale must be at least min-scale ({}), got {}",
                min, max
            ));
        }
        if let Some(step) = self.wheel_zoom_step {
            if !(step.is_finite() && step > 0.0) {
                return Err(format!("wheel-zoom-step must be positive, got {}", step));
            }
        }
        if self.autosave_delay_ms == Some(0) {
            return Err("autosave-delay-ms must be greater than 0".to_string());
        }
        if self.mention_limit == Some(0) {
            return Err("mention-limit must be at least 1".to_string());
        }
        if self.blur_grace_ms == Some(0) {
            return Err("blur-grace-ms must be greater than 0".to_string());
        }
        for (key, value) in [
            ("click-jitter-px", self.click_jitter_px),
            ("popup-margin-px", self.popup_margin_px),
        ] {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(format!("{} must be non-negative, got {}", key, v));
                }
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown or mistyped nodes are skipped.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            min_scale: first_value(doc, "min-scale").and_then(as_f64),
            max_scale: first_value(doc, "max-scale").and_then(as_f64),
            wheel_zoom_step: first_value(doc, "wheel-zoom-step").and_then(as_f64),
            autosave_delay_ms: first_value(doc, "autosave-delay-ms").and_then(as_u64),
            mention_limit: first_value(doc, "mention-limit")
                .and_then(as_u64)
                .map(|n| n as usize),
            click_jitter_px: first_value(doc, "click-jitter-px").and_then(as_f64),
            popup_margin_px: first_value(doc, "popup-margin-px").and_then(as_f64),
            blur_grace_ms: first_value(doc, "blur-grace-ms").and_then(as_u64),
        }
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        let nodes = doc.nodes_mut();

        if let Some(v) = self.min_scale {
            nodes.push(float_node("min-scale", v));
        }
        if let Some(v) = self.max_scale {
            nodes.push(float_node("max-scale", v));
        }
        if let Some(v) = self.wheel_zoom_step {
            nodes.push(float_node("wheel-zoom-step", v));
        }
        if let Some(v) = self.autosave_delay_ms {
            nodes.push(integer_node("autosave-delay-ms", v));
        }
        if let Some(v) = self.mention_limit {
            nodes.push(integer_node("mention-limit", v as u64));
        }
        if let Some(v) = self.click_jitter_px {
            nodes.push(float_node("click-jitter-px", v));
        }
        if let Some(v) = self.popup_margin_px {
            nodes.push(float_node("popup-margin-px", v));
        }
        if let Some(v) = self.blur_grace_ms {
            nodes.push(integer_node("blur-grace-ms", v));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &CorkConfig) {
        if other.min_scale.is_some() {
            self.min_scale = other.min_scale;
        }
        if other.max_scale.is_some() {
            self.max_scale = other.max_scale;
        }
        if other.wheel_zoom_step.is_some() {
            self.wheel_zoom_step = other.wheel_zoom_step;
        }
        if other.autosave_delay_ms.is_some() {
            self.autosave_delay_ms = other.autosave_delay_ms;
        }
        if other.mention_limit.is_some() {
            self.mention_limit = other.mention_limit;
        }
        if other.click_jitter_px.is_some() {
            self.click_jitter_px = other.click_jitter_px;
        }
        if other.popup_margin_px.is_some() {
            self.popup_margin_px = other.popup_margin_px;
        }
        if other.blur_grace_ms.is_some() {
            self.blur_grace_ms = other.blur_grace_ms;
        }
    }
}
