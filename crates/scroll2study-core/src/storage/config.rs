//! TOML-based application configuration.
//!
//! Stores:
//! - Catalog grid settings (duplicate cell policy)
//! - Session tracking thresholds and the local UTC offset
//! - AI service endpoint and model
//!
//! Configuration is stored at `~/.config/scroll2study/config.toml`.

use std::path::PathBuf;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::achievements::TrackingRules;
use crate::catalog::DuplicatePolicy;
use crate::error::{ConfigError, Result};

/// Catalog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

/// AI service configuration. The API key lives in the OS keyring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_temperature")]
    pub temperature: f64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/scroll2study/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Offset of the user's local time from UTC, in minutes. Uses the
    /// system offset when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub tracking: TrackingRules,
    #[serde(default)]
    pub ai: AiConfig,
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_ai_model() -> String {
    "gpt-4o-mini".into()
}
fn default_ai_temperature() -> f64 {
    0.7
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ai_base_url(),
            model: default_ai_model(),
            temperature: default_ai_temperature(),
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
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::MissingKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                serde_json::Value::Null => serde_json::from_str(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                serde_json::Value::String(_) => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Self = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path,
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
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

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.apply(key, value)?;
        self.save()
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check cross-field limits that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracking.validate()
    }

    /// The configured local offset, or the system's current one.
    pub fn local_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(|m| FixedOffset::east_opt(m * 60))
            .unwrap_or_else(|| *chrono::Local::now().offset())
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
        assert_eq!(parsed.tracking, TrackingRules::default());
        assert_eq!(parsed.catalog.duplicate_policy, DuplicatePolicy::LastWins);
        assert_eq!(parsed.ai.model, "gpt-4o-mini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[tracking]\nearly_bird_before_hour = 6\n").unwrap();
        assert_eq!(parsed.tracking.early_bird_before_hour, 6);
        assert_eq!(parsed.tracking.night_owl_from_hour, 22);
        assert_eq!(parsed.ai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("tracking.focus_session_min_seconds").as_deref(), Some("7200"));
        assert_eq!(cfg.get("catalog.duplicate_policy").as_deref(), Some("last_wins"));
        assert!(cfg.get("tracking.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("tracking.night_owl_from_hour", "23").unwrap();
        assert_eq!(cfg.tracking.night_owl_from_hour, 23);
    }

    #[test]
    fn apply_updates_enum_string() {
        let mut cfg = Config::default();
        cfg.apply("catalog.duplicate_policy", "reject").unwrap();
        assert_eq!(cfg.catalog.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn apply_rejects_unknown_enum_value() {
        let mut cfg = Config::default();
        assert!(cfg.apply("catalog.duplicate_policy", "random").is_err());
        assert_eq!(cfg.catalog.duplicate_policy, DuplicatePolicy::LastWins);
    }

    #[test]
    fn apply_rejects_diverse_window_beyond_history() {
        let mut cfg = Config::default();
        let err = cfg.apply("tracking.diverse_window_days", "1000000000").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "tracking.diverse_window_days"));
        assert_eq!(cfg.tracking.diverse_window_days, 7);

        assert!(cfg.apply("tracking.diverse_window_days", "0").is_err());
        cfg.apply("tracking.diverse_window_days", "31").unwrap();
        assert_eq!(cfg.tracking.diverse_window_days, 31);
    }

    #[test]
    fn oversized_window_in_file_fails_validation() {
        let parsed: Config = toml::from_str("[tracking]\ndiverse_window_days = 400\n").unwrap();
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn apply_sets_optional_offset() {
        let mut cfg = Config::default();
        cfg.apply("utc_offset_minutes", "-300").unwrap();
        assert_eq!(cfg.utc_offset_minutes, Some(-300));
        assert_eq!(cfg.local_offset().local_minus_utc(), -300 * 60);
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "tracking.nonexistent", "1");
        assert!(result.is_err());
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result =
            Config::set_json_value_by_path(&mut json, "tracking.focus_session_min_seconds", "lots");
        assert!(result.is_err());
    }
}
