//! Console and device terminal-mode control.
//!
//! The console is switched between the operator's cooked attributes and a
//! raw relay configuration; the saved attributes are restored on every way
//! out of raw mode. Devices get a fixed raw 8N1 configuration once per open.

mod guard;
mod modes;

use thiserror::Error;

pub use guard::{RawModeGuard, SavedModes};
pub use modes::{
    configure_device, get_attrs, raw_console_attrs, raw_device_attrs, same_attrs, set_attrs,
};

/// Console attribute failures. All of them are fatal: without a working
/// snapshot the console cannot be handed back to the operator intact.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("tcgetattr {stream}: {source}")]
    Query {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("tcsetattr {stream}: {source}")]
    Apply {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("restoring {stream}: {source}")]
    Restore {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },
}
