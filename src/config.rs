//! Tool configuration loaded from TOML: logging and retry defaults.

use crate::error::OpsError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "SPIRE_CONFIG";

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "spire.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: text or json
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Pause between retry attempts, in seconds.
    #[serde(default = "default_retry_pause")]
    pub pause_secs: f64,
}

fn default_retry_pause() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            pause_secs: default_retry_pause(),
        }
    }
}

impl RetryConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_secs_f64(self.pause_secs)
    }
}

impl ToolConfig {
    pub fn validate(&self) -> Result<(), OpsError> {
        const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(OpsError::Config(format!(
                "invalid log level: {} (expected one of {})",
                self.logging.level,
                LEVELS.join(", ")
            )));
        }
        if self.logging.format != "text" && self.logging.format != "json" {
            return Err(OpsError::Config(format!(
                "invalid log format: {} (expected text or json)",
                self.logging.format
            )));
        }
        if !self.retry.pause_secs.is_finite() || self.retry.pause_secs < 0.0 {
            return Err(OpsError::Config(format!(
                "invalid retry pause: {}",
                self.retry.pause_secs
            )));
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from an explicit file; a missing or malformed file is an error.
    pub fn load_from_file(path: &Path) -> Result<ToolConfig, OpsError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OpsError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: ToolConfig = toml::from_str(&raw)
            .map_err(|e| OpsError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `$SPIRE_CONFIG` if set, else `spire.toml` in the working
    /// directory if present, else defaults.
    pub fn load() -> Result<ToolConfig, OpsError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from_file(Path::new(&path));
        }
        let local = Path::new(CONFIG_FILE);
        if local.exists() {
            return Self::load_from_file(local);
        }
        Ok(ToolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ToolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.retry.pause(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_unknown_level() {
        let config: ToolConfig = toml::from_str("[logging]\nlevel = \"loud\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: ToolConfig = toml::from_str("[retry]\npause_secs = 0.5").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.pause(), Duration::from_millis(500));
        assert_eq!(config.logging.format, "text");
    }
}
