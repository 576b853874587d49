use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::escape::DEFAULT_ESCAPE_CHAR;
use crate::session::DEFAULT_BREAK_DURATION;

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub port: PortConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Initial session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Escape character as a byte value (default: 28, Ctrl-\).
    #[serde(default = "default_escape_char")]
    pub escape_char: u8,
    /// Break length in tenths of a second (default: 5).
    #[serde(default = "default_break_duration")]
    pub break_duration: u32,
    /// Translate NL to CRNL on console output while connected.
    #[serde(default)]
    pub translate_newlines: bool,
    /// Print received bytes as hex after the raw data.
    #[serde(default)]
    pub hex_trace: bool,
}

/// Device selected at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Device path (e.g., "/dev/ttyUSB0").
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Line speed applied after the device opens.
    #[serde(default)]
    pub speed: Option<u32>,
}

/// Diagnostic logging (not the session capture log).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `TT_LOG` is unset (default: "warn").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write diagnostics to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_escape_char() -> u8 {
    DEFAULT_ESCAPE_CHAR
}

fn default_break_duration() -> u32 {
    DEFAULT_BREAK_DURATION
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            escape_char: default_escape_char(),
            break_duration: default_break_duration(),
            translate_newlines: false,
            hex_trace: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}
