//! One-shot attribute writes on a connected device.

use std::io;
use std::os::unix::io::RawFd;
use std::thread;
use std::time::Duration;

use super::{DeviceConnection, DeviceError};
use crate::terminal::{get_attrs, set_attrs};

/// Supported line speeds, ascending, paired with their `speed_t` codes.
/// Speed 0 hangs up the line.
pub const SPEEDS: &[(u32, libc::speed_t)] = &[
    (0, libc::B0),
    (50, libc::B50),
    (75, libc::B75),
    (110, libc::B110),
    (134, libc::B134),
    (150, libc::B150),
    (200, libc::B200),
    (300, libc::B300),
    (600, libc::B600),
    (1200, libc::B1200),
    (1800, libc::B1800),
    (2400, libc::B2400),
    (4800, libc::B4800),
    (9600, libc::B9600),
    (19200, libc::B19200),
    (38400, libc::B38400),
    (57600, libc::B57600),
    (115200, libc::B115200),
    (230400, libc::B230400),
];

/// Check the speed table is strictly ascending with distinct codes.
pub fn validate_speed_table() -> Result<(), DeviceError> {
    for (i, pair) in SPEEDS.windows(2).enumerate() {
        if pair[0].0 >= pair[1].0 {
            return Err(DeviceError::SpeedTable(format!(
                "entry {} ({}) is not above {}",
                i + 1,
                pair[1].0,
                pair[0].0
            )));
        }
    }
    for (i, (speed, code)) in SPEEDS.iter().enumerate() {
        if SPEEDS[..i].iter().any(|(_, other)| other == code) {
            return Err(DeviceError::SpeedTable(format!(
                "speed {} shares its code with another entry",
                speed
            )));
        }
    }
    Ok(())
}

pub fn speed_to_code(speed: u32) -> Result<libc::speed_t, DeviceError> {
    SPEEDS
        .iter()
        .find(|(baud, _)| *baud == speed)
        .map(|(_, code)| *code)
        .ok_or(DeviceError::UnsupportedSpeed(speed))
}

pub fn code_to_speed(code: libc::speed_t) -> Option<u32> {
    SPEEDS
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(baud, _)| *baud)
}

/// Speeds an operator may pick (everything except the hang-up entry).
pub fn supported_speeds() -> impl Iterator<Item = u32> {
    SPEEDS.iter().map(|(baud, _)| *baud).filter(|baud| *baud != 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    RtsCts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemLine {
    Rts,
    Dtr,
}

impl ModemLine {
    fn bit(self) -> libc::c_int {
        match self {
            ModemLine::Rts => libc::TIOCM_RTS,
            ModemLine::Dtr => libc::TIOCM_DTR,
        }
    }
}

/// Attributes shown by the `show` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSettings {
    /// `None` when the hardware reports a speed outside [`SPEEDS`].
    pub speed: Option<u32>,
    pub flow: FlowControl,
    /// `false` when modem lines are ignored (CLOCAL).
    pub modem: bool,
}

pub fn set_speed(device: &DeviceConnection, speed: u32) -> Result<(), DeviceError> {
    let code = speed_to_code(speed)?;
    update_attrs(device, |termios| unsafe {
        libc::cfsetospeed(termios, code);
        libc::cfsetispeed(termios, code);
    })
}

pub fn set_flow_control(device: &DeviceConnection, flow: FlowControl) -> Result<(), DeviceError> {
    update_attrs(device, |termios| {
        termios.c_cflag &= !libc::CRTSCTS;
        if flow == FlowControl::RtsCts {
            termios.c_cflag |= libc::CRTSCTS;
        }
    })
}

/// `on` hangs up on last close (HUPCL); `off` ignores modem lines (CLOCAL).
pub fn set_modem_control(device: &DeviceConnection, on: bool) -> Result<(), DeviceError> {
    update_attrs(device, |termios| {
        termios.c_cflag &= !(libc::CLOCAL | libc::HUPCL);
        termios.c_cflag |= if on { libc::HUPCL } else { libc::CLOCAL };
    })
}

pub fn set_modem_line(
    device: &DeviceConnection,
    line: ModemLine,
    on: bool,
) -> Result<(), DeviceError> {
    let fd = device.connected_fd()?;
    let mut bits: libc::c_int = 0;
    if unsafe { libc::ioctl(fd, libc::TIOCMGET, &mut bits) } == -1 {
        return Err(attribute_error("TIOCMGET"));
    }
    if on {
        bits |= line.bit();
    } else {
        bits &= !line.bit();
    }
    if unsafe { libc::ioctl(fd, libc::TIOCMSET, &bits) } == -1 {
        return Err(attribute_error("TIOCMSET"));
    }
    Ok(())
}

pub fn read_port_settings(device: &DeviceConnection) -> Result<PortSettings, DeviceError> {
    let fd = device.connected_fd()?;
    let termios = get_attrs(fd).map_err(|source| DeviceError::Attribute {
        op: "tcgetattr",
        source,
    })?;
    let code = unsafe { libc::cfgetispeed(&termios) };
    Ok(PortSettings {
        speed: code_to_speed(code),
        flow: if termios.c_cflag & libc::CRTSCTS != 0 {
            FlowControl::RtsCts
        } else {
            FlowControl::None
        },
        modem: termios.c_cflag & libc::CLOCAL == 0,
    })
}

/// Hold the break condition for `tenths` tenths of a second.
pub fn send_break(device: &DeviceConnection, tenths: u32) -> Result<(), DeviceError> {
    let fd = device.connected_fd()?;
    if unsafe { libc::ioctl(fd, libc::TIOCSBRK) } == -1 {
        return Err(attribute_error("TIOCSBRK"));
    }
    let clear = scopeguard::guard(fd, |fd: RawFd| unsafe {
        libc::ioctl(fd, libc::TIOCCBRK);
    });
    thread::sleep(Duration::from_millis(u64::from(tenths) * 100));
    let fd = scopeguard::ScopeGuard::into_inner(clear);
    if unsafe { libc::ioctl(fd, libc::TIOCCBRK) } == -1 {
        return Err(attribute_error("TIOCCBRK"));
    }
    Ok(())
}

fn update_attrs(
    device: &DeviceConnection,
    change: impl FnOnce(&mut libc::termios),
) -> Result<(), DeviceError> {
    let fd = device.connected_fd()?;
    let mut termios = get_attrs(fd).map_err(|source| DeviceError::Attribute {
        op: "tcgetattr",
        source,
    })?;
    change(&mut termios);
    set_attrs(fd, &termios).map_err(|source| DeviceError::Attribute {
        op: "tcsetattr",
        source,
    })
}

fn attribute_error(op: &'static str) -> DeviceError {
    DeviceError::Attribute {
        op,
        source: io::Error::last_os_error(),
    }
}
