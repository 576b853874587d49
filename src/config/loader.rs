use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;
use crate::device::attrs::speed_to_code;
use crate::session::MAX_BREAK_DURATION;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/tt/config.toml` on Linux, or the platform
    /// equivalent via `dirs::config_dir()`. Falls back to the current
    /// directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("tt").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// A missing file yields `Config::default()`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Config::default());
        }

        Self::load_from(&path)
    }

    /// Loads configuration from an explicit path; the file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::ParseError { source, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parses and validates TOML configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The break duration is between 1 and `MAX_BREAK_DURATION` tenths
    /// - A configured port speed is one the device layer supports
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BREAK_DURATION).contains(&self.defaults.break_duration) {
            return Err(ConfigError::ValidationError {
                message: format!("break_duration must be between 1 and {}", MAX_BREAK_DURATION),
            });
        }

        if let Some(speed) = self.port.speed {
            if speed_to_code(speed).is_err() {
                return Err(ConfigError::ValidationError {
                    message: format!("Unsupported port speed {}", speed),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn zero_break_duration_is_rejected() {
        let err = Config::parse("[defaults]\nbreak_duration = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn overlong_break_duration_is_rejected() {
        assert!(Config::parse("[defaults]\nbreak_duration = 50\n").is_ok());
        let err = Config::parse("[defaults]\nbreak_duration = 51\n").unwrap_err();
        assert!(err.to_string().contains("between 1 and 50"));
    }

    #[test]
    fn unsupported_speed_is_rejected() {
        let err = Config::parse("[port]\npath = \"/dev/ttyS0\"\nspeed = 1234\n").unwrap_err();
        assert!(err.to_string().contains("1234"));
    }

    #[test]
    fn escape_char_out_of_range_fails_to_parse() {
        let err = Config::parse("[defaults]\nescape_char = 300\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
