//! TOML-based application configuration.
//!
//! Stores user scheduling preferences:
//! - Timezone and daily work window
//! - Default task duration
//! - External suggestion backend and its credentials
//! - Slot search tuning
//!
//! Configuration is stored at `~/.config/studyplan/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scheduler::EngineOptions;
use crate::schedule::{ProviderSettings, UserSchedulingPreferences, WorkWindow};

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "STUDYPLAN_API_KEY";

/// Returns `~/.config/studyplan[-dev]/` based on STUDYPLAN_ENV.
///
/// Set STUDYPLAN_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the config directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(".config");

    let env = std::env::var("STUDYPLAN_ENV").unwrap_or_else(|_| "production".to_string());
    let dir = if env == "dev" {
        base_dir.join("studyplan-dev")
    } else {
        base_dir.join("studyplan")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Timezone, work window and default duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreferencesConfig {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default = "default_window_start")]
    pub day_window_start_hour: u32,
    #[serde(default = "default_window_end")]
    pub day_window_end_hour: u32,
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
}

/// Slot search tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_step")]
    pub step_minutes: i64,
    #[serde(default = "default_max_days")]
    pub max_search_days: u32,
    #[serde(default = "default_min_duration")]
    pub min_duration_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyplan/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub preferences: PreferencesConfig,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub search: SearchConfig,
}

fn default_window_start() -> u32 {
    8
}
fn default_window_end() -> u32 {
    18
}
fn default_duration() -> u32 {
    60
}
fn default_step() -> i64 {
    15
}
fn default_max_days() -> u32 {
    30
}
fn default_min_duration() -> u32 {
    15
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            day_window_start_hour: default_window_start(),
            day_window_end_hour: default_window_end(),
            default_duration_minutes: default_duration(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            step_minutes: default_step(),
            max_search_days: default_max_days(),
            min_duration_minutes: default_min_duration(),
        }
    }
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
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<i64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    // empty clears optional strings
                    serde_json::Value::Null | serde_json::Value::String(_) if value.is_empty() => {
                        serde_json::Value::Null
                    }
                    _ => serde_json::Value::String(value.to_string()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Check the invariants the scheduler relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.preferences;
        if p.day_window_start_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "preferences.day_window_start_hour".to_string(),
                message: "must be between 0 and 23".to_string(),
            });
        }
        if p.day_window_end_hour > 24 || p.day_window_end_hour <= p.day_window_start_hour {
            return Err(ConfigError::InvalidValue {
                key: "preferences.day_window_end_hour".to_string(),
                message: "must be greater than day_window_start_hour and at most 24".to_string(),
            });
        }
        if p.default_duration_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "preferences.default_duration_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.search.step_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.step_minutes".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if missing.
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

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_err = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| load_err(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_err = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_err(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some("none".to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result violates [`Config::validate`]. `self` is left
    /// unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.provider.api_key.is_some() {
            cfg.provider.api_key = Some("********".to_string());
        }
        cfg
    }

    /// Scheduling preferences, with the API key taken from the environment
    /// when set.
    pub fn preferences(&self) -> UserSchedulingPreferences {
        let mut provider = self.provider.clone();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                provider.api_key = Some(key);
            }
        }
        UserSchedulingPreferences {
            timezone: self.preferences.timezone.clone(),
            window: WorkWindow::new(
                self.preferences.day_window_start_hour,
                self.preferences.day_window_end_hour,
            ),
            default_duration_minutes: self.preferences.default_duration_minutes,
            provider,
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            step_minutes: self.search.step_minutes,
            max_search_days: self.search.max_search_days,
            min_duration_minutes: self.search.min_duration_minutes,
        }
    }
}
