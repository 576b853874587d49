//! End-to-end relay tests over pseudo-terminals: one pty plays the
//! operator's console, another the serial device.
//!
//! Console end-of-input is not driven here: a pty only reports it after a
//! hangup, and a hung-up console cannot have its attributes restored, so
//! that exit is a fatal `Restore` error instead. The read-error exit is
//! covered with an input descriptor that cannot be read.

mod common;

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use common::{contains, spawn_relay, PtyEnd, TestConsole};
use tempfile::TempDir;
use tt::device::ConnectionState;
use tt::relay::{Console, LogMode, RelayOutcome};
use tt::session::Session;
use tt::terminal::same_attrs;

const ESC: u8 = 0x1c;

fn session_on(device: &PtyEnd) -> Session {
    let mut session = Session::default();
    session
        .device
        .select(device.path())
        .expect("Failed to open device pty");
    session
}

#[test]
fn console_bytes_reach_the_device_in_order() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());

    console.pty.send(b"AB");
    assert!(device.wait_for(b"AB"));

    console.pty.send(&[ESC, b'c']);
    let (_session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);

    device.settle(Duration::from_millis(100));
    assert_eq!(device.output(), b"AB");
}

#[test]
fn doubled_escape_sends_one_literal_escape() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());

    console.pty.send(&[ESC, ESC, b'z']);
    assert!(device.wait_for(&[ESC, b'z']));

    console.pty.send(&[ESC, b'c']);
    let (_session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert_eq!(device.output(), vec![ESC, b'z']);
}

#[test]
fn unknown_escape_command_rings_the_bell_once() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());
    console.pty.settle(Duration::from_millis(100));
    console.pty.clear_output();

    console.pty.send(&[ESC, b'x']);
    assert!(console.pty.wait_for(&[0x07]));
    console.pty.settle(Duration::from_millis(200));
    let bells = console.pty.output().iter().filter(|b| **b == 0x07).count();
    assert_eq!(bells, 1);

    console.pty.send(&[ESC, b'c']);
    let (_session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert!(device.output().is_empty());
}

#[test]
fn return_to_prompt_restores_console_attributes() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();
    let before = console.attrs();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());

    console.pty.send(&[ESC, b'C']);
    let (session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert!(same_attrs(&before, &console.attrs()));
    assert_eq!(session.device.state(), ConnectionState::Connected);
}

#[test]
fn quit_terminates_and_restores_console_attributes() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();
    let before = console.attrs();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());

    console.pty.send(&[ESC, b'q']);
    let (_session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::Terminated);
    assert!(same_attrs(&before, &console.attrs()));
    assert!(device.output().is_empty());
}

#[test]
fn help_leaves_operator_at_escape_subprompt() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());

    console.pty.send(&[ESC, b'h']);
    assert!(console.pty.wait_for(b"Command> "));
    assert!(console.wait_until_raw());

    // Still pending: 'c' is a command here, not data for the device.
    console.pty.send(b"c");
    let (_session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert!(device.output().is_empty());
}

#[test]
fn device_output_fans_out_to_console_log_and_hex_trace() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let log_path = dir.path().join("session.log");

    let mut console = TestConsole::open();
    let mut device = PtyEnd::open();

    let mut session = session_on(&device);
    session.settings.hex_trace = true;
    session
        .start_log(&log_path, LogMode::Overwrite)
        .expect("Failed to open session log");

    let handle = spawn_relay(session, console.console());
    assert!(console.wait_until_raw());

    device.send(b"hi");
    assert!(console.pty.wait_for(b"hi[68][69]\r\n"));

    console.pty.send(&[ESC, b'c']);
    let (mut session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert_eq!(session.stop_log(), Some(log_path.clone()));
    assert_eq!(std::fs::read(&log_path).expect("read log"), b"hi");
}

#[test]
fn device_hangup_keeps_relay_running_and_reconnecting() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open_quiet();
    let device_path = device.path().to_path_buf();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());

    drop(device);
    let notice = format!("Trying to reconnect to \"{}\"", device_path.display());
    assert!(console.pty.wait_for(notice.as_bytes()));

    console.pty.send(&[ESC, b'c']);
    let (session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert_eq!(session.device.path(), Some(device_path.as_path()));
}

#[test]
fn absent_device_is_picked_up_and_early_input_dropped() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let link = dir.path().join("ttyTEST");

    let mut console = TestConsole::open();
    let device = PtyEnd::open();

    let mut session = Session::default();
    assert!(session.device.select(&link).is_err());
    assert_eq!(session.device.state(), ConnectionState::Disconnected);

    let handle = spawn_relay(session, console.console());
    assert!(console.wait_until_raw());
    assert!(console.pty.wait_for(b"Trying to reconnect to"));

    console.pty.send(b"lost");
    console.pty.settle(Duration::from_millis(100));

    std::os::unix::fs::symlink(device.path(), &link).expect("Failed to link device");
    assert!(console.pty.wait_for(b"Connected, press"));

    console.pty.send(b"ok");
    assert!(device.wait_for(b"ok"));

    console.pty.send(&[ESC, b'c']);
    let (session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert_eq!(session.device.state(), ConnectionState::Connected);
    assert!(!contains(&device.output(), b"lost"));
}

#[test]
fn break_escape_asserts_and_clears_break() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();

    let mut session = session_on(&device);
    session.settings.break_duration = 1;
    let handle = spawn_relay(session, console.console());
    assert!(console.wait_until_raw());

    console.pty.send(&[ESC, b'b']);
    assert!(console.pty.wait_for(b"break\r\nbreak done\r\n"));
    assert!(device.output().is_empty());

    // Back in the data stream after the break.
    console.pty.send(b"k");
    assert!(device.wait_for(b"k"));

    console.pty.send(&[ESC, b'c']);
    let (session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert_eq!(session.device.state(), ConnectionState::Connected);
    assert_eq!(device.output(), b"k");
}

#[test]
fn shell_escape_returns_to_escape_subprompt() {
    std::env::set_var("SHELL", "/bin/true");
    let mut console = TestConsole::open();
    let device = PtyEnd::open();
    let before = console.attrs();

    let handle = spawn_relay(session_on(&device), console.console());
    assert!(console.wait_until_raw());

    console.pty.send(&[ESC, b'!']);
    assert!(console.pty.wait_for(b"Back at the terminal"));
    assert!(console.pty.wait_for(b"Command> "));
    assert!(console.wait_until_raw());

    // Still pending: 'c' is a command here, not data for the device.
    console.pty.send(b"c");
    let (_session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert!(same_attrs(&before, &console.attrs()));
    assert!(device.output().is_empty());
}

#[test]
fn console_read_error_ends_relay_and_restores_attributes() {
    let mut console = TestConsole::open();
    let device = PtyEnd::open();
    let before = console.attrs();

    // Same tty, opened write-only: it reports readable but read() fails.
    let input = OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(console.pty.path())
        .expect("Failed to open console input");
    let relay_console = Console::new(input.as_raw_fd(), console.fd(), console.fd());

    let handle = spawn_relay(session_on(&device), relay_console);
    assert!(console.wait_until_raw());

    console.pty.send(b"x");
    let (session, result) = handle.join().expect("relay thread panicked");
    assert_eq!(result.expect("relay failed"), RelayOutcome::ClosedByOperator);
    assert!(console.pty.wait_for(b"read console: "));
    assert!(same_attrs(&before, &console.attrs()));
    assert_eq!(session.device.state(), ConnectionState::Connected);
    assert!(device.output().is_empty());
}
