//! The single live session: settings, device and session log.

use std::io;
use std::path::PathBuf;

use crate::config::Defaults;
use crate::device::DeviceConnection;
use crate::escape::DEFAULT_ESCAPE_CHAR;
use crate::relay::{LogMode, SessionLog};

/// Break length in tenths of a second.
pub const DEFAULT_BREAK_DURATION: u32 = 5;

/// Longest accepted break, in tenths of a second.
pub const MAX_BREAK_DURATION: u32 = 50;

/// Operator-adjustable relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub escape_char: u8,
    /// Tenths of a second, 1 to [`MAX_BREAK_DURATION`].
    pub break_duration: u32,
    /// Translate NL to CRNL on console output while relaying.
    pub translate_newlines: bool,
    /// Echo every received chunk as `[xx]` hex after the raw bytes.
    pub hex_trace: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            escape_char: DEFAULT_ESCAPE_CHAR,
            break_duration: DEFAULT_BREAK_DURATION,
            translate_newlines: false,
            hex_trace: false,
        }
    }
}

impl From<&Defaults> for Settings {
    fn from(defaults: &Defaults) -> Self {
        Self {
            escape_char: defaults.escape_char,
            break_duration: defaults.break_duration,
            translate_newlines: defaults.translate_newlines,
            hex_trace: defaults.hex_trace,
        }
    }
}

/// Process-wide relay context, passed by reference to every component.
#[derive(Debug, Default)]
pub struct Session {
    pub settings: Settings,
    pub device: DeviceConnection,
    log: Option<SessionLog>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            device: DeviceConnection::new(),
            log: None,
        }
    }

    pub fn log(&self) -> Option<&SessionLog> {
        self.log.as_ref()
    }

    pub fn log_mut(&mut self) -> Option<&mut SessionLog> {
        self.log.as_mut()
    }

    /// Open a new session log, closing any previous one first.
    pub fn start_log(
        &mut self,
        path: impl Into<PathBuf>,
        mode: LogMode,
    ) -> io::Result<&SessionLog> {
        self.log = None;
        let log = SessionLog::open(path, mode)?;
        tracing::info!(path = %log.path().display(), ?mode, "session log started");
        Ok(self.log.insert(log))
    }

    /// Close the session log; returns the closed log's path.
    pub fn stop_log(&mut self) -> Option<PathBuf> {
        self.log.take().map(|log| log.path().to_path_buf())
    }

    /// Close the device and the log before the process exits.
    /// Returns whether a log was open.
    pub fn shutdown(&mut self) -> bool {
        self.device.close();
        self.stop_log().is_some()
    }
}
