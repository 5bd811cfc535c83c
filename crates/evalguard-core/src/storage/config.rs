//! TOML-based application configuration.
//!
//! Stores:
//! - Portal location and navigation targets
//! - Evaluation countdown intervals and thresholds
//! - Session timeout budget, polling and activity refresh
//!
//! Configuration is stored at `~/.config/evalguard/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

/// Where the portal lives and where terminal transitions send the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Raw `Cookie` header sent with every oracle request (CLI use).
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
}

/// Evaluation countdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_first_sync_delay_secs")]
    pub first_sync_delay_secs: u64,
    /// Local/server disagreement (seconds) above which the server wins.
    #[serde(default = "default_drift_tolerance_secs")]
    pub drift_tolerance_secs: u64,
    #[serde(default = "default_warning_threshold_secs")]
    pub warning_threshold_secs: u64,
    #[serde(default = "default_final_warning_threshold_secs")]
    pub final_warning_threshold_secs: u64,
    /// Pause between the expiration report and leaving the form.
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
}

/// Session inactivity timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_budget_secs")]
    pub budget_secs: u64,
    #[serde(default = "default_warning_threshold_secs")]
    pub warning_threshold_secs: u64,
    #[serde(default = "default_sync_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_activity_refresh_secs")]
    pub activity_refresh_secs: u64,
    /// Paths on which the monitor never runs.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/evalguard/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:5000".into()
}
fn default_landing_path() -> String {
    "/student/dashboard".into()
}
fn default_login_path() -> String {
    "/login".into()
}
fn default_logout_path() -> String {
    "/logout".into()
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_sync_interval_secs() -> u64 {
    30
}
fn default_first_sync_delay_secs() -> u64 {
    2
}
fn default_drift_tolerance_secs() -> u64 {
    5
}
fn default_warning_threshold_secs() -> u64 {
    300
}
fn default_final_warning_threshold_secs() -> u64 {
    60
}
fn default_redirect_delay_ms() -> u64 {
    2000
}
fn default_session_budget_secs() -> u64 {
    3600
}
fn default_activity_refresh_secs() -> u64 {
    300
}
fn default_public_paths() -> Vec<String> {
    ["/login", "/signup", "/forgot-password", "/reset-password", "/logout"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie: None,
            landing_path: default_landing_path(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            sync_interval_secs: default_sync_interval_secs(),
            first_sync_delay_secs: default_first_sync_delay_secs(),
            drift_tolerance_secs: default_drift_tolerance_secs(),
            warning_threshold_secs: default_warning_threshold_secs(),
            final_warning_threshold_secs: default_final_warning_threshold_secs(),
            redirect_delay_ms: default_redirect_delay_ms(),
        }
    }
}

impl EvaluationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn first_sync_delay(&self) -> Duration {
        Duration::from_secs(self.first_sync_delay_secs)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            budget_secs: default_session_budget_secs(),
            warning_threshold_secs: default_warning_threshold_secs(),
            poll_interval_secs: default_sync_interval_secs(),
            activity_refresh_secs: default_activity_refresh_secs(),
            public_paths: default_public_paths(),
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Whether the monitor must stay off on `path`.
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.contains(p.as_str()))
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
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Array(_) => serde_json::Value::Array(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(|s| serde_json::Value::String(s.to_string()))
                            .collect(),
                    ),
                    serde_json::Value::Object(_) => {
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

    /// Default on-disk location.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(source) => Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
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

    /// Set a config value by key in memory. Returns error if key is unknown.
    ///
    /// Callers persist with [`Config::save`] or [`Config::save_to`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
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
        assert_eq!(parsed.evaluation.drift_tolerance_secs, 5);
        assert_eq!(parsed.session.budget_secs, 3600);
        assert_eq!(parsed.server.landing_path, "/student/dashboard");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[session]\npoll_interval_secs = 10\n").unwrap();
        assert_eq!(parsed.session.poll_interval_secs, 10);
        assert_eq!(parsed.session.warning_threshold_secs, 300);
        assert_eq!(parsed.evaluation.sync_interval_secs, 30);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("evaluation.sync_interval_secs").as_deref(), Some("30"));
        assert_eq!(cfg.get("server.login_path").as_deref(), Some("/login"));
        assert!(cfg.get("server.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("evaluation.drift_tolerance_secs", "8").unwrap();
        assert_eq!(cfg.evaluation.drift_tolerance_secs, 8);
    }

    #[test]
    fn set_updates_optional_string() {
        let mut cfg = Config::default();
        cfg.set("server.cookie", "session=abc").unwrap();
        assert_eq!(cfg.server.cookie.as_deref(), Some("session=abc"));
    }

    #[test]
    fn set_splits_list_values() {
        let mut cfg = Config::default();
        cfg.set("session.public_paths", "/login, /help").unwrap();
        assert_eq!(cfg.session.public_paths, vec!["/login", "/help"]);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("server.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_rejects_invalid_number() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("session.budget_secs", "an hour"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn public_paths_match_by_substring() {
        let cfg = SessionConfig::default();
        assert!(cfg.is_public_path("/login"));
        assert!(cfg.is_public_path("/auth/reset-password/token"));
        assert!(!cfg.is_public_path("/student/dashboard"));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.session.activity_refresh_secs, 300);
    }

    #[test]
    fn load_from_keeps_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the config path exists but cannot be read as text.
        let path = dir.path().join("config.toml");
        std::fs::create_dir(&path).unwrap();

        let err = Config::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::ReadFailed { .. }));
        assert!(path.is_dir());
    }
}
