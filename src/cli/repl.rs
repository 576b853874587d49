//! Interactive command prompt.

use std::io::Write;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::{Flow, Interpreter};

const PROMPT: &str = "> ";

/// Read and execute commands until `quit` or end-of-input.
///
/// Ctrl-C discards the current line. Only console failures that leave the
/// terminal unusable are returned as errors.
pub fn run_repl<W: Write>(interp: &mut Interpreter<W>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = rl.add_history_entry(line.as_str()) {
                        tracing::debug!("history entry dropped: {}", err);
                    }
                }
                match interp.handle(&line) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => return Ok(()),
                    Err(err) if err.is_fatal() => return Err(err.into()),
                    Err(err) => interp.report(&err),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
    }
}
