//! termios snapshots and the two fixed configurations the relay needs.

use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;

/// Read the current attributes of a terminal descriptor.
pub fn get_attrs(fd: RawFd) -> io::Result<libc::termios> {
    let mut termios = MaybeUninit::<libc::termios>::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { termios.assume_init() })
}

/// Apply attributes immediately (`TCSANOW`).
pub fn set_attrs(fd: RawFd, termios: &libc::termios) -> io::Result<()> {
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Derive the console relay configuration from a saved snapshot.
///
/// No canonical editing, echo, signal characters or input translation.
/// Output post-processing stays off unless newline translation is asked
/// for, in which case only NL -> CRNL is enabled.
pub fn raw_console_attrs(saved: &libc::termios, translate_newlines: bool) -> libc::termios {
    let mut termios = *saved;
    unsafe { libc::cfmakeraw(&mut termios) };
    termios.c_oflag = if translate_newlines {
        libc::OPOST | libc::ONLCR
    } else {
        0
    };
    termios.c_cc[libc::VMIN] = 1;
    termios.c_cc[libc::VTIME] = 0;
    termios
}

/// Raw 8N1 line discipline for a serial device, receiver enabled.
pub fn raw_device_attrs(current: &libc::termios) -> libc::termios {
    let mut termios = *current;
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    termios.c_cflag |= libc::CS8 | libc::CREAD;
    termios
}

/// Configure a freshly opened device descriptor for byte-transparent relay.
pub fn configure_device(fd: RawFd) -> io::Result<()> {
    let current = get_attrs(fd)?;
    set_attrs(fd, &raw_device_attrs(&current))
}

/// Field-wise comparison; `libc::termios` has no `PartialEq` by default.
pub fn same_attrs(a: &libc::termios, b: &libc::termios) -> bool {
    a.c_iflag == b.c_iflag
        && a.c_oflag == b.c_oflag
        && a.c_cflag == b.c_cflag
        && a.c_lflag == b.c_lflag
        && a.c_cc == b.c_cc
        && unsafe { libc::cfgetispeed(a) == libc::cfgetispeed(b) }
        && unsafe { libc::cfgetospeed(a) == libc::cfgetospeed(b) }
}
