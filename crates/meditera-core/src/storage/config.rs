//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Workout durations (exercise, rest, laps)
//! - Retry policy for account store calls
//! - Log level
//! - An optional custom routine replacing the built-in one
//!
//! Configuration is stored at `~/.config/meditera/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigError, ValidationError};
use crate::progress::RetryPolicy;
use crate::session::{Routine, SessionConfig};

/// Workout timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutConfig {
    #[serde(default = "default_exercise_secs")]
    pub exercise_secs: u64,
    #[serde(default = "default_rest_secs")]
    pub rest_secs: u64,
    /// Full passes through the routine.
    #[serde(default = "default_laps")]
    pub laps: u32,
    /// Overrides `laps` when set.
    #[serde(default)]
    pub total_secs: Option<u64>,
    /// Clock period. 1000 outside of demos.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Logging configuration. `RUST_LOG` wins when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/meditera/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub workout: WorkoutConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub custom_routine: Option<Routine>,
}

// Default functions
fn default_exercise_secs() -> u64 {
    45
}
fn default_rest_secs() -> u64 {
    15
}
fn default_laps() -> u32 {
    1
}
fn default_tick_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for WorkoutConfig {
    fn default() -> Self {
        Self {
            exercise_secs: default_exercise_secs(),
            rest_secs: default_rest_secs(),
            laps: default_laps(),
            total_secs: None,
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
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
        if matches!(parts.peek(), None | Some(&"")) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    // Clears optional values; non-optional fields fail to deserialize.
                    _ if value == "none" => serde_json::Value::Null,
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    // Optional numbers are stored as null until first set.
                    serde_json::Value::Null => match value.parse::<u64>() {
                        Ok(n) => serde_json::Value::Number(n.into()),
                        Err(_) => serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?,
                    },
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
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

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    pub fn routine(&self) -> Routine {
        self.custom_routine.clone().unwrap_or_default()
    }

    /// Session parameters for the configured routine.
    ///
    /// # Errors
    /// Returns a `ValidationError` if the durations cannot drive a session.
    pub fn session_config(&self) -> Result<SessionConfig, ValidationError> {
        let routine = self.routine();
        let w = &self.workout;
        let mut cfg = SessionConfig::for_routine(&routine, w.exercise_secs, w.rest_secs, w.laps);
        if let Some(total) = w.total_secs {
            cfg.total_secs = total;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[workout]\nrest_secs = 30\n").unwrap();
        assert_eq!(parsed.workout.rest_secs, 30);
        assert_eq!(parsed.workout.exercise_secs, 45);
        assert_eq!(parsed.retry, RetryPolicy::default());
        assert_eq!(parsed.log.level, "info");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("workout.exercise_secs").as_deref(), Some("45"));
        assert_eq!(cfg.get("log.level").as_deref(), Some("info"));
        assert_eq!(cfg.get("workout.total_secs").as_deref(), Some("null"));
        assert!(cfg.get("workout.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("retry.max_attempts", "5").unwrap();
        assert_eq!(cfg.retry.max_attempts, 5);
    }

    #[test]
    fn apply_sets_and_clears_optional_total() {
        let mut cfg = Config::default();
        cfg.apply("workout.total_secs", "120").unwrap();
        assert_eq!(cfg.workout.total_secs, Some(120));
        cfg.apply("workout.total_secs", "none").unwrap();
        assert_eq!(cfg.workout.total_secs, None);
    }

    #[test]
    fn apply_updates_string() {
        let mut cfg = Config::default();
        cfg.apply("log.level", "debug").unwrap();
        assert_eq!(cfg.log.level, "debug");
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("workout.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.apply("", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("workout.rest_secs", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.workout.rest_secs, 15);
    }

    #[test]
    fn session_config_uses_routine_length() {
        let cfg = Config::default();
        let session = cfg.session_config().unwrap();
        assert_eq!(session.exercise_count, 9);
        assert_eq!(session.total_secs, 9 * 60);
    }

    #[test]
    fn session_config_honours_total_override() {
        let mut cfg = Config::default();
        cfg.workout.total_secs = Some(120);
        assert_eq!(cfg.session_config().unwrap().total_secs, 120);
    }

    #[test]
    fn session_config_rejects_zero_cycle() {
        let mut cfg = Config::default();
        cfg.workout.exercise_secs = 0;
        cfg.workout.rest_secs = 0;
        assert!(cfg.session_config().is_err());
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.workout.laps = 3;
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().workout.laps, 3);
    }
}
