//! The command prompt: abbreviated command lookup, the interpreter, scripts
//! and the interactive line editor.

mod commands;
mod fuzzy;
mod interpreter;
mod repl;
mod script;

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::device::DeviceError;
use crate::relay::RelayError;

pub use commands::{help_lines, lookup, CommandDef, CommandId, Lookup, COMMANDS};
pub use fuzzy::{fuzzy_match, is_prefix_ignore_case, parse_switch};
pub use interpreter::{Interpreter, DEFAULT_LOG_FILE};
pub use repl::run_repl;
pub use script::{run_script, script_path, ScriptError, SCRIPT_DIR};

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A failed command. Everything except a console that can no longer be
/// restored is reported and the prompt carries on.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command given without arguments or with `?`; carries the usage text.
    #[error("usage: {0}")]
    Usage(String),

    #[error("Invalid parameter, try \"{0} ?\" for help")]
    InvalidParameter(&'static str),

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("ambiguous command\n{0}")]
    Ambiguous(String),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("failed to open {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("failed to start shell: {0}")]
    Shell(#[source] io::Error),

    #[error("shell exited with {0}")]
    ShellStatus(ExitStatus),

    #[error("write: {0}")]
    Output(#[from] io::Error),
}

impl CommandError {
    /// Console attribute failures end the program.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommandError::Relay(RelayError::Terminal(_)))
    }
}
