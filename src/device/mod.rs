//! Serial device ownership: open/reconnect lifecycle and attribute setters.

pub mod attrs;
mod connection;

use std::path::PathBuf;

use thiserror::Error;

pub use attrs::{FlowControl, ModemLine, PortSettings};
pub use connection::{publish_port, ConnectionState, DeviceConnection, PORT_ENV_VAR};

/// Errors from device selection and attribute changes. None of them change
/// the connection state on their own; they are reported to the operator.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No port selected")]
    NotConnected,

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{op}: {source}")]
    Attribute {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported speed {0}")]
    UnsupportedSpeed(u32),

    #[error("invalid speed table: {0}")]
    SpeedTable(String),
}
