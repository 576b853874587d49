//! The relay loop behind the `connect` command.
//!
//! One thread multiplexes console input and device input with a bounded
//! wait, so reconnect attempts keep happening while the operator is idle.
//! Within one iteration the console is always served before the device.

mod console;
mod sink;

use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use thiserror::Error;

use crate::device::{attrs, ConnectionState};
use crate::escape::{describe_escape, ControlAction, EscapeOutput, EscapeReducer, EscapeState};
use crate::session::Session;
use crate::terminal::{RawModeGuard, TerminalError};

pub use console::{wait_readable, wait_writable, Console, Readiness};
pub use sink::{hex_trace, LogMode, SessionLog};

/// Upper bound on one wait; also the reconnect cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Largest chunk read from the device per iteration.
pub const READ_CHUNK: usize = 1024;

const BELL: u8 = 0x07;

/// How a relay session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Back to the command prompt; the device stays open.
    ClosedByOperator,
    /// The operator asked to quit the program.
    Terminated,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("No port selected")]
    NoPortSelected,

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("select: {0}")]
    Wait(#[source] io::Error),
}

/// Relay bytes between `console` and the session's device until the
/// operator leaves.
///
/// Raw mode is entered once on the way in and the saved console
/// attributes are restored exactly once on the way out, whatever the exit
/// path.
pub fn connect(session: &mut Session, console: &Console) -> Result<RelayOutcome, RelayError> {
    let path = session
        .device
        .path()
        .map(|p| p.to_path_buf())
        .ok_or(RelayError::NoPortSelected)?;

    if session.device.state() == ConnectionState::Connected {
        console.notice(&connected_notice(session.settings.escape_char));
    } else {
        console.notice(&format!("\r\nTrying to reconnect to \"{}\"", path.display()));
    }

    let mut raw = RawModeGuard::enter(
        console.input_fd(),
        console.output_fd(),
        session.settings.translate_newlines,
    )?;
    tracing::debug!(path = %path.display(), "relay started");

    let result = Relay {
        session,
        console,
        raw: &mut raw,
        path,
        escape: EscapeState::Idle,
        log_failed: false,
    }
    .run();

    raw.release()?;
    let outcome = result?;
    tracing::debug!(?outcome, "relay finished");
    Ok(outcome)
}

struct Relay<'a> {
    session: &'a mut Session,
    console: &'a Console,
    raw: &'a mut RawModeGuard,
    path: PathBuf,
    escape: EscapeState,
    log_failed: bool,
}

impl Relay<'_> {
    fn run(&mut self) -> Result<RelayOutcome, RelayError> {
        loop {
            let device_fd = self.session.device.raw_fd();
            let ready = wait_readable(self.console.input_fd(), device_fd, POLL_INTERVAL)
                .map_err(RelayError::Wait)?;

            if ready.console {
                let byte = match self.console.read_byte() {
                    Ok(Some(byte)) => byte,
                    Ok(None) => {
                        self.console.notice("read console: EOF");
                        return Ok(RelayOutcome::ClosedByOperator);
                    }
                    Err(err) => {
                        self.console.notice(&format!("read console: {}", err));
                        return Ok(RelayOutcome::ClosedByOperator);
                    }
                };
                if let Some(outcome) = self.on_console_byte(byte)? {
                    return Ok(outcome);
                }
            }

            match self.session.device.state() {
                ConnectionState::Disconnected => {
                    if self.session.device.try_reconnect() {
                        self.console
                            .notice(&connected_notice(self.session.settings.escape_char));
                    }
                }
                ConnectionState::Connected if ready.device => {
                    if let Some(outcome) = self.pump_device() {
                        return Ok(outcome);
                    }
                }
                _ => {}
            }
        }
    }

    fn on_console_byte(&mut self, byte: u8) -> Result<Option<RelayOutcome>, RelayError> {
        let escape_char = self.session.settings.escape_char;
        let (next, output) = EscapeReducer::reduce(self.escape, byte, escape_char);
        self.escape = next;

        match output {
            EscapeOutput::Consumed => Ok(None),
            EscapeOutput::Forward(byte) => {
                self.write_device(&[byte]);
                Ok(None)
            }
            EscapeOutput::Control(action) => {
                let outcome = self.perform(action)?;
                if action.returns_to_subprompt() {
                    self.escape = EscapeState::Pending;
                }
                Ok(outcome)
            }
        }
    }

    fn perform(&mut self, action: ControlAction) -> Result<Option<RelayOutcome>, RelayError> {
        tracing::debug!(?action, "escape command");
        let escape_char = self.session.settings.escape_char;
        match action {
            ControlAction::ShowHelp => {
                self.raw.suspend()?;
                self.print(&help_text(escape_char));
                self.raw.resume()?;
            }
            ControlAction::StartShell => {
                self.raw.suspend()?;
                self.print("\nStarting a shell\n");
                run_shell();
                self.print("\nBack at the terminal\nCommand> ");
                self.raw.resume()?;
            }
            ControlAction::ReturnToPrompt => return Ok(Some(RelayOutcome::ClosedByOperator)),
            ControlAction::Quit => return Ok(Some(RelayOutcome::Terminated)),
            ControlAction::SendBreak => self.send_break(),
            ControlAction::SendLiteralEscape => self.write_device(&[escape_char]),
            ControlAction::Unknown => self.print_bytes(&[BELL]),
        }
        Ok(None)
    }

    fn send_break(&mut self) {
        if self.session.device.state() != ConnectionState::Connected {
            self.console.notice("break: not connected");
            return;
        }
        self.console.notice("break");
        match attrs::send_break(&self.session.device, self.session.settings.break_duration) {
            Ok(()) => self.console.notice("break done"),
            Err(err) => self.console.notice(&format!("break: {}", err)),
        }
    }

    /// Send bytes to the device. With no device connected they are
    /// discarded, never queued.
    fn write_device(&mut self, mut bytes: &[u8]) {
        let Some(mut file) = self.session.device.file() else {
            tracing::trace!(count = bytes.len(), "device not connected, input dropped");
            return;
        };

        while !bytes.is_empty() {
            match file.write(bytes) {
                Ok(0) => {
                    self.console
                        .notice(&format!("write {}: buffer full?", self.path.display()));
                    return;
                }
                Ok(n) => bytes = &bytes[n..],
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    match wait_writable(file.as_raw_fd(), POLL_INTERVAL) {
                        Ok(true) => {}
                        Ok(false) => {
                            self.console.notice(&format!(
                                "write {}: device not accepting data, {} byte(s) dropped",
                                self.path.display(),
                                bytes.len()
                            ));
                            return;
                        }
                        Err(err) => {
                            self.device_lost(&format!("select {}: {}", self.path.display(), err));
                            return;
                        }
                    }
                }
                Err(err) => {
                    self.device_lost(&format!("write {}: {}", self.path.display(), err));
                    return;
                }
            }
        }
    }

    /// Read one chunk from the device and fan it out to the console, the
    /// session log and the hex trace.
    fn pump_device(&mut self) -> Option<RelayOutcome> {
        let mut buf = [0u8; READ_CHUNK];
        let read = match self.session.device.file() {
            Some(mut file) => file.read(&mut buf),
            None => return None,
        };
        let n = match read {
            Ok(0) => {
                self.device_lost(&format!("read {}: EOF", self.path.display()));
                return None;
            }
            Ok(n) => n,
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return None;
            }
            Err(err) => {
                self.device_lost(&format!("read {}: {}", self.path.display(), err));
                return None;
            }
        };
        let chunk = &buf[..n];

        if let Err(err) = self.console.write_all(chunk) {
            self.console.notice(&format!("write console: {}", err));
            return Some(RelayOutcome::ClosedByOperator);
        }

        if let Some(log) = self.session.log_mut() {
            if let Err(err) = log.append(chunk) {
                if !self.log_failed {
                    let message = format!("write {}: {}", log.path().display(), err);
                    self.log_failed = true;
                    self.console.notice(&message);
                }
            }
        }

        if self.session.settings.hex_trace {
            if let Err(err) = self.console.write_all(&hex_trace(chunk)) {
                self.console.notice(&format!("write console: {}", err));
                return Some(RelayOutcome::ClosedByOperator);
            }
        }
        None
    }

    fn device_lost(&mut self, reason: &str) {
        self.session.device.mark_lost();
        self.console.notice(reason);
        self.console
            .notice(&format!("Trying to reconnect to \"{}\"", self.path.display()));
    }

    fn print(&self, text: &str) {
        self.print_bytes(text.as_bytes());
    }

    fn print_bytes(&self, bytes: &[u8]) {
        if let Err(err) = self.console.write_all(bytes) {
            tracing::warn!("console write failed: {}", err);
        }
    }
}

fn connected_notice(escape_char: u8) -> String {
    format!(
        "Connected, press {} c to return to the command prompt",
        describe_escape(escape_char)
    )
}

/// Help shown for the escape sub-prompt; ends with the `Command> ` prompt.
pub fn help_text(escape_char: u8) -> String {
    let escape = describe_escape(escape_char);
    format!(
        "\n{escape}\tSend {escape}\n\
         h or ?\tShow this help message\n\
         !\tStart a shell\n\
         b\tSend a break\n\
         c\tReturn to the command line\n\
         q\tQuit\n\
         Command> "
    )
}

/// Run the operator's `$SHELL` (falling back to `/bin/sh`) interactively.
fn run_shell() {
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
    match Command::new(&shell).status() {
        Ok(status) => tracing::debug!(%shell, ?status, "shell exited"),
        Err(err) => eprintln!("failed to start {}: {}", shell, err),
    }
}
