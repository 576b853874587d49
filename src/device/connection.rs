use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use super::DeviceError;
use crate::terminal::configure_device;

/// Environment variable mirroring the selected device path for child
/// processes (shell escapes, scripts).
pub const PORT_ENV_VAR: &str = "TT_PORT";

/// Device lifecycle as seen by the relay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No device path recorded.
    NotSelected,
    /// Path recorded, no usable descriptor (never opened or lost).
    Disconnected,
    /// Descriptor open and configured.
    Connected,
}

/// Owns the device path and, while connected, its descriptor.
///
/// The descriptor is only ever replaced through this type, so nothing can
/// keep using a stale one across a reconnect.
#[derive(Debug, Default)]
pub struct DeviceConnection {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl DeviceConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        match (&self.path, &self.file) {
            (None, _) => ConnectionState::NotSelected,
            (Some(_), None) => ConnectionState::Disconnected,
            (Some(_), Some(_)) => ConnectionState::Connected,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    pub fn raw_fd(&self) -> Option<RawFd> {
        self.file.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// Descriptor of a connected device, for the attribute setters.
    pub fn connected_fd(&self) -> Result<RawFd, DeviceError> {
        self.raw_fd().ok_or(DeviceError::NotConnected)
    }

    /// Record `path` as the device and try to open it.
    ///
    /// Any previous descriptor is closed first. On failure the path stays
    /// recorded and the state is `Disconnected`, so a later `connect` keeps
    /// retrying it.
    pub fn select(&mut self, path: impl Into<PathBuf>) -> Result<ConnectionState, DeviceError> {
        let path = path.into();
        self.file = None;
        publish_port(Some(&path));
        self.path = Some(path.clone());

        match open_device(&path) {
            Ok(file) => {
                tracing::info!(path = %path.display(), "device opened");
                self.file = Some(file);
                Ok(ConnectionState::Connected)
            }
            Err(source) => {
                tracing::debug!(path = %path.display(), "device open failed: {}", source);
                Err(DeviceError::Open { path, source })
            }
        }
    }

    /// One non-blocking open attempt of the recorded path.
    ///
    /// Returns `true` only when this call moved the device to `Connected`.
    /// Failure is the normal state while a device is unplugged, so it is
    /// not reported.
    pub fn try_reconnect(&mut self) -> bool {
        if self.file.is_some() {
            return false;
        }
        let Some(path) = self.path.as_ref() else {
            return false;
        };
        match open_device(path) {
            Ok(file) => {
                tracing::info!(path = %path.display(), "device reconnected");
                self.file = Some(file);
                true
            }
            Err(err) => {
                tracing::trace!(path = %path.display(), "reconnect attempt failed: {}", err);
                false
            }
        }
    }

    /// Drop the descriptor after an I/O error or EOF, keeping the path.
    pub fn mark_lost(&mut self) {
        if self.file.take().is_some() {
            if let Some(path) = &self.path {
                tracing::info!(path = %path.display(), "device lost");
            }
        }
    }

    /// Close the descriptor; the path is kept so reconnecting stays possible.
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Close and forget the device.
    pub fn clear(&mut self) {
        self.file = None;
        self.path = None;
        publish_port(None);
    }
}

/// Update the `TT_PORT` side channel (empty when nothing is selected).
pub fn publish_port(path: Option<&Path>) {
    let value = path
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::env::set_var(PORT_ENV_VAR, value);
}

fn open_device(path: &Path) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(path)?;
    configure_device(file.as_raw_fd())?;
    Ok(file)
}
