use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// The operator's side of the relay: input, output and error descriptors.
///
/// Descriptors are borrowed; the caller keeps them open for as long as the
/// console is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Console {
    input: RawFd,
    output: RawFd,
    error: RawFd,
}

impl Console {
    pub fn new(input: RawFd, output: RawFd, error: RawFd) -> Self {
        Self {
            input,
            output,
            error,
        }
    }

    pub fn stdio() -> Self {
        Self::new(libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO)
    }

    pub fn input_fd(&self) -> RawFd {
        self.input
    }

    pub fn output_fd(&self) -> RawFd {
        self.output
    }

    /// Read a single byte. `Ok(None)` means end of input.
    pub fn read_byte(&self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        loop {
            let n = unsafe { libc::read(self.input, (&mut byte as *mut u8).cast(), 1) };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            return Ok((n == 1).then_some(byte));
        }
    }

    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        write_fd(self.output, bytes)
    }

    /// One-line diagnostic on the error channel. CRLF-terminated so it
    /// renders in raw mode too; write failures are ignored.
    pub fn notice(&self, message: &str) {
        let line = format!("{}\r\n", message);
        if let Err(err) = write_fd(self.error, line.as_bytes()) {
            tracing::debug!("console notice dropped: {}", err);
        }
    }
}

fn write_fd(fd: RawFd, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted => continue,
                io::ErrorKind::WouldBlock => {
                    wait_writable(fd, Duration::from_millis(100))?;
                    continue;
                }
                _ => return Err(err),
            }
        }
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "console accepted no data"));
        }
        bytes = &bytes[n as usize..];
    }
    Ok(())
}

/// Which descriptors became readable during a wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub console: bool,
    pub device: bool,
}

/// Wait up to `timeout` for the console and, when given, the device to
/// become readable.
///
/// Uses `select()` like the rest of our tty code (more reliable than
/// `poll()` on macOS). An interrupted wait reports nothing ready; the loop
/// simply goes round again.
pub fn wait_readable(
    console: RawFd,
    device: Option<RawFd>,
    timeout: Duration,
) -> io::Result<Readiness> {
    unsafe {
        let mut read_fds: libc::fd_set = std::mem::zeroed();
        libc::FD_ZERO(&mut read_fds);
        libc::FD_SET(console, &mut read_fds);
        let mut max_fd = console;
        if let Some(fd) = device {
            libc::FD_SET(fd, &mut read_fds);
            max_fd = max_fd.max(fd);
        }

        let mut tv = timeval(timeout);
        let ret = libc::select(
            max_fd + 1,
            &mut read_fds,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            &mut tv,
        );
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::default());
            }
            return Err(err);
        }

        Ok(Readiness {
            console: libc::FD_ISSET(console, &read_fds),
            device: device.is_some_and(|fd| libc::FD_ISSET(fd, &read_fds)),
        })
    }
}

/// Wait up to `timeout` for `fd` to accept writes. Returns whether it did.
pub fn wait_writable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    unsafe {
        let mut write_fds: libc::fd_set = std::mem::zeroed();
        libc::FD_ZERO(&mut write_fds);
        libc::FD_SET(fd, &mut write_fds);
        let mut tv = timeval(timeout);
        let ret = libc::select(
            fd + 1,
            std::ptr::null_mut(),
            &mut write_fds,
            std::ptr::null_mut(),
            &mut tv,
        );
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        Ok(ret > 0)
    }
}

fn timeval(timeout: Duration) -> libc::timeval {
    libc::timeval {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::time::Instant;

    fn pipe() -> (std::fs::File, std::fs::File) {
        use std::os::unix::io::FromRawFd;
        let mut fds = [0 as libc::c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        unsafe {
            (
                std::fs::File::from_raw_fd(fds[0]),
                std::fs::File::from_raw_fd(fds[1]),
            )
        }
    }

    #[test]
    fn wait_times_out_when_nothing_is_ready() {
        let (read_end, _write_end) = pipe();
        let started = Instant::now();
        let ready = wait_readable(read_end.as_raw_fd(), None, Duration::from_millis(50)).unwrap();
        assert_eq!(ready, Readiness::default());
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn console_bytes_are_read_one_at_a_time() {
        let (read_end, write_end) = pipe();
        let console = Console::new(
            read_end.as_raw_fd(),
            write_end.as_raw_fd(),
            write_end.as_raw_fd(),
        );
        console.write_all(b"xy").unwrap();

        let ready = wait_readable(console.input_fd(), None, Duration::from_secs(1)).unwrap();
        assert!(ready.console);
        assert_eq!(console.read_byte().unwrap(), Some(b'x'));
        assert_eq!(console.read_byte().unwrap(), Some(b'y'));
    }

    #[test]
    fn closed_input_reads_as_eof() {
        let (read_end, write_end) = pipe();
        drop(write_end);
        let console = Console::new(read_end.as_raw_fd(), -1, -1);
        assert_eq!(console.read_byte().unwrap(), None);
    }

    #[test]
    fn device_readiness_is_reported_separately() {
        let (console_read, _console_write) = pipe();
        let (device_read, device_write) = pipe();
        write_fd(device_write.as_raw_fd(), b"z").unwrap();

        let ready = wait_readable(
            console_read.as_raw_fd(),
            Some(device_read.as_raw_fd()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(!ready.console);
        assert!(ready.device);
    }
}
