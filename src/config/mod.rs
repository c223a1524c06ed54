//! Configuration module for Upload Relay
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. Every section has defaults,
//! so an empty file (or no file at all) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// # Examples
///
/// ```ignore
/// std::env::set_var("MY_VAR", "value");
/// let result = expand_env_vars("prefix-${MY_VAR}-suffix");
/// assert_eq!(result, "prefix-value-suffix");
///
/// let result = expand_env_vars("${MISSING:-default}");
/// assert_eq!(result, "default");
/// ```
pub(crate) fn expand_env_vars(s: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}") {
        Ok(re) => re,
        Err(_) => return s.to_string(),
    };
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        result.push_str(&s[last_match..full_match.start()]);

        let value = match std::env::var(var_name.as_str()) {
            Ok(val) => val,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                // No env var and no default. Keep the original placeholder.
                None => full_match.as_str().to_string(),
            },
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    result.push_str(&s[last_match..]);

    result
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub uploads: UploadDefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let namespace = self.events.namespace.trim();
        if namespace.is_empty() {
            return Err(ConfigError::ValidationError(
                "Event namespace cannot be empty".into(),
            ));
        }
        if namespace.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "Event namespace '{}' must not contain whitespace",
                self.events.namespace
            )));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "Event channel capacity must be greater than zero".into(),
            ));
        }

        match self.uploads.method.to_ascii_uppercase().as_str() {
            "POST" | "PUT" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid default upload method '{}': must be 'POST' or 'PUT'",
                    self.uploads.method
                )))
            }
        }

        for (name, value) in [
            ("connect_timeout_secs", self.uploads.connect_timeout_secs),
            ("write_timeout_secs", self.uploads.write_timeout_secs),
            ("read_timeout_secs", self.uploads.read_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "uploads.{} must be greater than zero",
                    name
                )));
            }
        }

        if self.uploads.notification_channel.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Notification channel cannot be empty".into(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level '{}': must be trace, debug, info, warn or error",
                    self.logging.level
                )))
            }
        }

        Ok(())
    }
}

/// Event emission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Prefix of every emitted event name. Default: "RNUploadManager"
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Buffer size of the broadcast sink. Default: 256
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_namespace() -> String {
    crate::event::DEFAULT_NAMESPACE.to_string()
}

fn default_channel_capacity() -> usize {
    256
}

/// What the advancer does when the queue owner is already gone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetachedOwnerPolicy {
    /// Log a warning and skip advancement
    #[default]
    Warn,
    /// Treat it as a host lifecycle bug and panic
    Panic,
}

/// Queue configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub on_detached_owner: DetachedOwnerPolicy,
}

/// Defaults applied to upload options that leave a field unset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDefaults {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    #[serde(default = "default_true")]
    pub follow_ssl_redirects: bool,
    #[serde(default = "default_true")]
    pub retry_on_connection_failure: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_io_timeout")]
    pub write_timeout_secs: u64,
    #[serde(default = "default_io_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_notification_channel")]
    pub notification_channel: String,
}

impl UploadDefaults {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            method: default_method(),
            max_retries: default_max_retries(),
            follow_redirects: true,
            follow_ssl_redirects: true,
            retry_on_connection_failure: true,
            connect_timeout_secs: default_connect_timeout(),
            write_timeout_secs: default_io_timeout(),
            read_timeout_secs: default_io_timeout(),
            notification_channel: default_notification_channel(),
        }
    }
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_io_timeout() -> u64 {
    60
}

fn default_notification_channel() -> String {
    "BackgroundUploadChannel".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Fallback level when RUST_LOG is unset. Default: "info"
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.events.namespace, "RNUploadManager");
        assert_eq!(config.queue.on_detached_owner, DetachedOwnerPolicy::Warn);
        assert_eq!(config.uploads.max_retries, 2);
        assert_eq!(config.uploads.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.uploads.read_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_validation_empty_namespace() {
        let mut config = Config::default();
        config.events.namespace = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_method() {
        let mut config = Config::default();
        config.uploads.method = "DELETE".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.uploads.write_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("write_timeout_secs"));
    }

    #[test]
    fn test_expand_env_default_value() {
        let result = expand_env_vars("${UPLOAD_RELAY_SURELY_UNSET:-fallback}");
        assert_eq!(result, "fallback");
    }

    #[test]
    fn test_expand_env_keeps_unknown_placeholder() {
        let result = expand_env_vars("ns-${UPLOAD_RELAY_SURELY_UNSET}");
        assert_eq!(result, "ns-${UPLOAD_RELAY_SURELY_UNSET}");
    }
}
