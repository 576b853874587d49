//! Shared test utilities: pseudo-terminal pairs standing in for the
//! operator's console and for the serial device.

#![allow(dead_code, unused_imports)]

use parking_lot::Mutex;
use portable_pty::{native_pty_system, MasterPty, PtySize, SlavePty};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tt::relay::{self, Console, RelayError, RelayOutcome};
use tt::session::Session;
use tt::terminal::get_attrs;

pub type SpyBuffer = Arc<Mutex<Vec<u8>>>;

pub const WAIT: Duration = Duration::from_secs(5);

/// One pty pair. The test drives the master side; the code under test
/// opens the slave by path.
pub struct PtyEnd {
    master: Box<dyn MasterPty + Send>,
    slave: Box<dyn SlavePty + Send>,
    writer: Box<dyn Write + Send>,
    output: SpyBuffer,
    path: PathBuf,
}

impl PtyEnd {
    pub fn open() -> Self {
        Self::build(true)
    }

    /// No reader thread: the reader holds a duplicate of the master, so
    /// only a quiet pty can be fully hung up by dropping it.
    pub fn open_quiet() -> Self {
        Self::build(false)
    }

    fn build(spy: bool) -> Self {
        let pair = native_pty_system()
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .expect("Failed to open pty");
        let path = pair.master.tty_name().expect("pty has no slave path");
        let writer = pair.master.take_writer().expect("Failed to take writer");
        let output = SpyBuffer::default();
        if spy {
            let reader = pair.master.try_clone_reader().expect("Failed to clone reader");
            spawn_spy(reader, Arc::clone(&output));
        }

        Self {
            master: pair.master,
            slave: pair.slave,
            writer,
            output,
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes arriving on the slave side, as seen by the code under test.
    pub fn send(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("Failed to write to pty");
        self.writer.flush().expect("Failed to flush pty");
    }

    /// Everything the code under test wrote to the slave so far.
    pub fn output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }

    pub fn clear_output(&self) {
        self.output.lock().clear();
    }

    pub fn wait_for(&self, needle: &[u8]) -> bool {
        wait_until(|| contains(&self.output.lock(), needle))
    }

    /// Wait until the output has been quiet for `settle`.
    pub fn settle(&self, settle: Duration) {
        let mut last = self.output.lock().len();
        loop {
            thread::sleep(settle);
            let now = self.output.lock().len();
            if now == last {
                return;
            }
            last = now;
        }
    }
}

fn spawn_spy(mut reader: Box<dyn Read + Send>, output: SpyBuffer) {
    thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => output.lock().extend_from_slice(&buf[..n]),
            }
        }
    });
}

/// The operator's terminal: a pty whose slave is the console's stdin,
/// stdout and stderr.
pub struct TestConsole {
    pub pty: PtyEnd,
    file: File,
}

impl TestConsole {
    pub fn open() -> Self {
        let pty = PtyEnd::open();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(pty.path())
            .expect("Failed to open console slave");
        Self { pty, file }
    }

    pub fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    pub fn console(&self) -> Console {
        Console::new(self.fd(), self.fd(), self.fd())
    }

    pub fn attrs(&self) -> libc::termios {
        get_attrs(self.fd()).expect("tcgetattr on console")
    }

    /// The relay reads single bytes only once canonical mode is off.
    pub fn wait_until_raw(&self) -> bool {
        wait_until(|| self.attrs().c_lflag & libc::ICANON == 0)
    }

    pub fn wait_until_cooked(&self) -> bool {
        wait_until(|| self.attrs().c_lflag & libc::ICANON != 0)
    }
}

pub type RelayHandle = thread::JoinHandle<(Session, Result<RelayOutcome, RelayError>)>;

/// Run `connect` on its own thread; the session comes back on join.
pub fn spawn_relay(mut session: Session, console: Console) -> RelayHandle {
    thread::spawn(move || {
        let result = relay::connect(&mut session, &console);
        (session, result)
    })
}

pub fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < WAIT {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    check()
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
