use std::os::unix::io::RawFd;

use super::modes::{get_attrs, raw_console_attrs, set_attrs};
use super::TerminalError;

/// Console attributes captured before entering raw mode.
#[derive(Clone, Copy)]
pub struct SavedModes {
    input_fd: RawFd,
    output_fd: RawFd,
    input: libc::termios,
    output: libc::termios,
}

impl SavedModes {
    pub fn capture(input_fd: RawFd, output_fd: RawFd) -> Result<Self, TerminalError> {
        let input = get_attrs(input_fd).map_err(|source| TerminalError::Query {
            stream: "console input",
            source,
        })?;
        let output = get_attrs(output_fd).map_err(|source| TerminalError::Query {
            stream: "console output",
            source,
        })?;
        Ok(Self {
            input_fd,
            output_fd,
            input,
            output,
        })
    }

    /// Apply the raw relay configuration to both console descriptors.
    pub fn apply_raw(&self, translate_newlines: bool) -> Result<(), TerminalError> {
        let raw = raw_console_attrs(&self.input, translate_newlines);
        set_attrs(self.input_fd, &raw).map_err(|source| TerminalError::Apply {
            stream: "console input",
            source,
        })?;
        set_attrs(self.output_fd, &raw).map_err(|source| TerminalError::Apply {
            stream: "console output",
            source,
        })
    }

    pub fn restore(&self) -> Result<(), TerminalError> {
        set_attrs(self.input_fd, &self.input).map_err(|source| TerminalError::Restore {
            stream: "console input",
            source,
        })?;
        set_attrs(self.output_fd, &self.output).map_err(|source| TerminalError::Restore {
            stream: "console output",
            source,
        })
    }
}

/// Holds the console in raw mode until released.
///
/// `release` restores the saved attributes exactly once and reports
/// failure. If the guard is dropped without being released (early return,
/// panic unwinding) the attributes are restored on a best-effort basis.
pub struct RawModeGuard {
    saved: SavedModes,
    translate_newlines: bool,
    raw: bool,
}

impl RawModeGuard {
    pub fn enter(
        input_fd: RawFd,
        output_fd: RawFd,
        translate_newlines: bool,
    ) -> Result<Self, TerminalError> {
        let saved = SavedModes::capture(input_fd, output_fd)?;
        let mut guard = Self {
            saved,
            translate_newlines,
            raw: false,
        };
        guard.resume()?;
        Ok(guard)
    }

    /// Temporarily return to the saved (cooked) attributes.
    pub fn suspend(&mut self) -> Result<(), TerminalError> {
        if self.raw {
            self.saved.restore()?;
            self.raw = false;
        }
        Ok(())
    }

    /// Re-enter raw mode after `suspend`.
    pub fn resume(&mut self) -> Result<(), TerminalError> {
        if !self.raw {
            if let Err(err) = self.saved.apply_raw(self.translate_newlines) {
                let _ = self.saved.restore();
                return Err(err);
            }
            self.raw = true;
        }
        Ok(())
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn release(mut self) -> Result<(), TerminalError> {
        let result = if self.raw {
            self.saved.restore()
        } else {
            Ok(())
        };
        self.raw = false;
        result
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.raw {
            if let Err(err) = self.saved.restore() {
                tracing::error!("failed to restore console attributes: {}", err);
            }
        }
    }
}
