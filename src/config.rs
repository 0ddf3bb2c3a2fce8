// Config file holding raw policy values

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engine::policy::{self, KNOWN_KEYS, RawPolicy};
use crate::engine::tables::SUPPORTED_RESOLUTIONS;

/// On-disk configuration.
///
/// Only the `[policy]` table is read. Its keys match the environment variables
/// and values go through the same resolver, so a bad value in the file gets
/// the same warning and default as a bad environment variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: BTreeMap<String, toml::Value>,
}

impl Default for Config {
    fn default() -> Self {
        let resolutions = SUPPORTED_RESOLUTIONS
            .iter()
            .map(|h| toml::Value::Integer(i64::from(*h)))
            .collect();

        let policy = BTreeMap::from([
            (
                policy::KEY_DO_NOT_TRANSCODE.to_string(),
                toml::Value::Boolean(false),
            ),
            (
                policy::KEY_RESOLUTIONS.to_string(),
                toml::Value::Array(resolutions),
            ),
            (
                policy::KEY_PRESET.to_string(),
                toml::Value::String("medium".to_string()),
            ),
            (
                policy::KEY_H264_PROFILE.to_string(),
                toml::Value::String("main".to_string()),
            ),
            (policy::KEY_CRF_H264.to_string(), toml::Value::Integer(23)),
            (policy::KEY_CRF_H265.to_string(), toml::Value::Integer(28)),
            (policy::KEY_CRF_VP9.to_string(), toml::Value::Integer(32)),
            (
                policy::KEY_AUDIO_CODEC.to_string(),
                toml::Value::String("aac".to_string()),
            ),
            (
                policy::KEY_AUDIO_BITRATE.to_string(),
                toml::Value::String("128k".to_string()),
            ),
            (
                policy::KEY_BACKEND.to_string(),
                toml::Value::String("cpu".to_string()),
            ),
            (
                policy::KEY_GPU_PRESET.to_string(),
                toml::Value::String("p4".to_string()),
            ),
            (policy::KEY_HLS_ENABLE.to_string(), toml::Value::Boolean(true)),
            (policy::KEY_HLS_TIME.to_string(), toml::Value::Integer(6)),
            (
                policy::KEY_FFMPEG_COMMAND.to_string(),
                toml::Value::String(policy::DEFAULT_FFMPEG_COMMAND.to_string()),
            ),
        ]);

        Self { policy }
    }
}

/// Flatten a TOML value into the string form the resolver expects.
/// Arrays become comma-separated lists.
fn value_to_raw(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Array(items) => items
            .iter()
            .map(value_to_raw)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".config")
                .join("ffplan")
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("ffplan")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config file, or the built-in defaults if there is none
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            debug!(path = %config_path.display(), "No config file, using defaults");
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Check if config file exists
    pub fn exists() -> bool {
        Self::config_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Create a default config file if it doesn't exist
    pub fn ensure_default() -> Result<()> {
        if !Self::exists() {
            Config::default().save()?;
        }
        Ok(())
    }

    /// File values as raw resolver input
    pub fn to_raw(&self) -> RawPolicy {
        self.policy
            .iter()
            .map(|(key, value)| (key.clone(), value_to_raw(value)))
            .collect()
    }

    /// Keys in `[policy]` the resolver does not read
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.policy
            .keys()
            .map(String::as_str)
            .filter(|k| !KNOWN_KEYS.contains(k))
            .collect()
    }

    /// File values with environment overrides applied on top
    pub fn raw_policy_with(&self, env: &RawPolicy) -> RawPolicy {
        let mut raw = self.to_raw();
        raw.overlay(env);
        raw
    }
}
