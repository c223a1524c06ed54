//! Configuration loader with environment variable expansion

use super::{expand_env_vars, Config, ConfigError};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from YAML text
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let expanded = expand_env_vars(content);
        // serde_yaml rejects an empty document, treat it as all defaults
        let config: Config = if expanded.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&expanded)?
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DetachedOwnerPolicy, LogFormat};

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config.events.namespace, "RNUploadManager");
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
queue:
  on_detached_owner: panic
logging:
  format: json
"#;
        let config = ConfigLoader::parse(yaml).unwrap();
        assert_eq!(config.queue.on_detached_owner, DetachedOwnerPolicy::Panic);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.uploads.method, "POST");
    }

    #[test]
    #[serial_test::serial]
    fn test_expand_env_vars() {
        std::env::set_var("UPLOAD_RELAY_TEST_NS", "MyApp");
        let config = ConfigLoader::parse("events:\n  namespace: ${UPLOAD_RELAY_TEST_NS}\n").unwrap();
        assert_eq!(config.events.namespace, "MyApp");
        std::env::remove_var("UPLOAD_RELAY_TEST_NS");
    }

    #[test]
    fn test_invalid_policy_is_parse_error() {
        let result = ConfigLoader::parse("queue:\n  on_detached_owner: ignore\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
