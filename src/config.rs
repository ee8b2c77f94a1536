//! Configuration file parsing
//!
//! Parses TOML configuration files for the store helper. Every section is
//! optional; command-line flags override whatever the file sets.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Helper configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Dispatcher settings
    #[serde(default)]
    pub helper: HelperConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store location
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding store paths
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// State directory (temp roots live below it)
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            state_dir: default_state_dir(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("/nix/store")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/nix/var/nix")
}

/// Dispatcher settings
#[derive(Debug, Clone, Deserialize)]
pub struct HelperConfig {
    /// Initial size of the payload scratch buffer
    #[serde(default = "default_initial_buffer_len")]
    pub initial_buffer_len: usize,

    /// Largest payload accepted before the connection is abandoned
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            initial_buffer_len: default_initial_buffer_len(),
            max_payload_len: default_max_payload_len(),
        }
    }
}

fn default_initial_buffer_len() -> usize {
    4096
}

fn default_max_payload_len() -> usize {
    1024 * 1024
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.helper.max_payload_len == 0 {
            return Err(ConfigError::Invalid(
                "helper.max_payload_len must be greater than zero".to_string(),
            ));
        }
        if self.helper.initial_buffer_len > self.helper.max_payload_len {
            return Err(ConfigError::Invalid(format!(
                "helper.initial_buffer_len ({}) exceeds helper.max_payload_len ({})",
                self.helper.initial_buffer_len, self.helper.max_payload_len
            )));
        }
        if parse_log_level(&self.logging.level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}

/// Parse log level string
pub fn parse_log_level(level: &str) -> Option<log::LevelFilter> {
    match level.to_lowercase().as_str() {
        "trace" => Some(log::LevelFilter::Trace),
        "debug" => Some(log::LevelFilter::Debug),
        "info" => Some(log::LevelFilter::Info),
        "warn" | "warning" => Some(log::LevelFilter::Warn),
        "error" => Some(log::LevelFilter::Error),
        "off" => Some(log::LevelFilter::Off),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.store.store_dir, PathBuf::from("/nix/store"));
        assert_eq!(config.store.state_dir, PathBuf::from("/nix/var/nix"));
        assert_eq!(config.helper.initial_buffer_len, 4096);
        assert_eq!(config.helper.max_payload_len, 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
[store]
store_dir = "/tmp/test/store"
state_dir = "/tmp/test/var/nix"

[helper]
initial_buffer_len = 256
max_payload_len = 65536

[logging]
level = "debug"
"#;

        let config = Config::parse(config_str).unwrap();
        assert_eq!(config.store.store_dir, PathBuf::from("/tmp/test/store"));
        assert_eq!(config.helper.initial_buffer_len, 256);
        assert_eq!(config.helper.max_payload_len, 65536);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_zero_payload_limit_error() {
        let config_str = r#"
[helper]
initial_buffer_len = 0
max_payload_len = 0
"#;
        let result = Config::parse(config_str);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_buffer_larger_than_limit_error() {
        let config_str = r#"
[helper]
initial_buffer_len = 8192
max_payload_len = 1024
"#;
        let result = Config::parse(config_str);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_log_level_error() {
        let result = Config::parse("[logging]\nlevel = \"chatty\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("WARNING"), Some(log::LevelFilter::Warn));
        assert_eq!(parse_log_level("off"), Some(log::LevelFilter::Off));
        assert_eq!(parse_log_level("loud"), None);
    }
}
