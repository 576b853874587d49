//! Startup scripts: `tt <name>` runs `$HOME/.tt/<name>` line by line.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

use super::{CommandError, Flow, Interpreter};

/// Directory under `$HOME` holding scripts.
pub const SCRIPT_DIR: &str = ".tt";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cannot locate home directory")]
    NoHome,

    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{name}: error at line {line}, aborting script")]
    Aborted { name: String, line: usize },

    #[error(transparent)]
    Fatal(CommandError),
}

pub fn script_path(name: &str) -> Result<PathBuf, ScriptError> {
    let home = dirs::home_dir().ok_or(ScriptError::NoHome)?;
    Ok(home.join(SCRIPT_DIR).join(name))
}

/// Echo and execute every line of the named script.
///
/// The first failing line is reported and stops the script. `Flow::Quit`
/// from a `quit` line is passed back to the caller.
pub fn run_script<W: Write>(
    interp: &mut Interpreter<W>,
    name: &str,
) -> Result<Flow, ScriptError> {
    let path = script_path(name)?;
    let content = fs::read_to_string(&path).map_err(|source| ScriptError::Read {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), "running script");

    for (index, line) in content.lines().enumerate() {
        let echoed = writeln!(interp.out_mut(), "{}", line);
        if let Err(err) = echoed {
            return Err(ScriptError::Fatal(err.into()));
        }
        match interp.handle(line) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => return Ok(Flow::Quit),
            Err(err) if err.is_fatal() => return Err(ScriptError::Fatal(err)),
            Err(err) => {
                interp.report(&err);
                return Err(ScriptError::Aborted {
                    name: name.to_string(),
                    line: index + 1,
                });
            }
        }
    }
    Ok(Flow::Continue)
}
