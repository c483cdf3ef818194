//! Manifest types for overlay configuration.
//!
//! The manifest only feeds default configuration values. It is not
//! validated beyond what deserialization requires.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use overlay_ipc::OverlayConfig;

use crate::SdkResult;

/// Type of a configuration option, as shown in the config editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOptionType {
    String,
    Number,
    Color,
    Boolean,
}

/// A single configurable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOption {
    pub key: String,

    #[serde(rename = "type")]
    pub kind: ConfigOptionType,

    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

/// A labelled group of options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub options: Vec<ConfigOption>,
}

/// Manifest document published next to an overlay bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<BTreeMap<String, ConfigGroup>>,
}

impl OverlayManifest {
    /// Parse a manifest from an already decoded JSON value.
    pub fn from_value(value: Value) -> SdkResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a `manifest.json` file.
    pub fn from_path(path: &Path) -> SdkResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Iterate over every option in every group.
    pub fn options(&self) -> impl Iterator<Item = &ConfigOption> {
        self.config
            .iter()
            .flat_map(|groups| groups.values())
            .flat_map(|group| group.options.iter())
    }
}

/// Collect the default value of every option that declares one.
pub fn default_config(manifest: &OverlayManifest) -> OverlayConfig {
    manifest
        .options()
        .filter_map(|option| {
            option
                .default
                .clone()
                .map(|value| (option.key.clone(), value))
        })
        .collect()
}

/// Overlay stored values on top of the defaults.
pub fn merge_with_defaults(stored: &OverlayConfig, defaults: &OverlayConfig) -> OverlayConfig {
    let mut merged = defaults.clone();
    for (key, value) in stored {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
