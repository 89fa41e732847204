//! TOML-based application configuration.
//!
//! Stores:
//! - Reminder preferences (work hours, per-category intervals, snooze)
//! - Engine settings (tick period, trigger cap, sleep-gap detection)
//!
//! Configuration is stored at `~/.config/wellnudge/config.toml`.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::data_dir;
use crate::collaborators::PreferenceStore;
use crate::engine::EngineSettings;
use crate::error::ConfigError;
use crate::preferences::Preferences;
use crate::reminder::MAX_TRIGGERS_PER_CATEGORY;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettingsConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_max_triggers")]
    pub max_triggers_per_category: usize,
    /// Tick gaps longer than this many seconds count as sleep. 0 disables.
    #[serde(default)]
    pub sleep_gap_threshold_secs: u64,
}

fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_max_triggers() -> usize {
    MAX_TRIGGERS_PER_CATEGORY
}

impl Default for EngineSettingsConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_triggers_per_category: default_max_triggers(),
            sleep_gap_threshold_secs: 0,
        }
    }
}

impl EngineSettingsConfig {
    pub fn to_settings(&self) -> EngineSettings {
        let threshold = i64::try_from(self.sleep_gap_threshold_secs).unwrap_or(i64::MAX);
        EngineSettings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            max_triggers_per_category: self.max_triggers_per_category,
            sleep_gap_threshold: (threshold > 0).then(|| {
                chrono::Duration::try_seconds(threshold).unwrap_or(chrono::Duration::MAX)
            }),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/wellnudge/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub engine: EngineSettingsConfig,
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<i64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `config.toml` inside [`data_dir`].
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        toml::from_str(&content).map_err(|e| load_failed(e.to_string()))
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key, keeping the existing value's type.
    /// Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into that field (including malformed `HH:MM` times).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Every leaf key with its current value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

/// [`PreferenceStore`] over `config.toml`.
///
/// Re-reads the file only when its modification time changes. A file that
/// fails to read or parse (half-saved edit, typo) keeps the last good
/// snapshot.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    modified: Option<SystemTime>,
    snapshot: Preferences,
}

impl FilePreferenceStore {
    /// Store over the default config path.
    pub fn open() -> Result<Self, ConfigError> {
        Ok(Self::at(Config::path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            modified: None,
            snapshot: Preferences::default(),
        };
        store.refresh();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refresh(&mut self) {
        let modified = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "config not readable, keeping preferences");
                return;
            }
        };
        if self.modified == Some(modified) {
            return;
        }
        self.modified = Some(modified);

        match Config::load_from(&self.path) {
            Ok(config) => {
                debug!(path = %self.path.display(), "preferences reloaded");
                self.snapshot = config.preferences;
            }
            Err(err) => warn!(error = %err, "invalid config, keeping last good preferences"),
        }
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&mut self) -> Preferences {
        self.refresh();
        self.snapshot.clone()
    }
}
