use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use tt::cli::{run_repl, run_script, Flow, Interpreter, ScriptError};
use tt::config::Config;
use tt::device::{attrs, publish_port};
use tt::logging::init_tracing;
use tt::relay::Console;
use tt::session::{Session, Settings};

#[derive(Debug, Parser)]
#[command(name = "tt", version, about = "Serial terminal")]
struct Cli {
    /// Configuration file (default: <config dir>/tt/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Script in ~/.tt to run before the prompt.
    script: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to open diagnostic log")?;
    attrs::validate_speed_table()?;
    publish_port(None);

    let console = Console::stdio();
    let session = Session::new(Settings::from(&config.defaults));
    let mut interp = Interpreter::new(session, console, io::stdout());

    if let Some(path) = &config.port.path {
        match interp.session_mut().device.select(path.clone()) {
            Ok(_) => {
                if let Some(speed) = config.port.speed {
                    if let Err(err) = attrs::set_speed(&interp.session().device, speed) {
                        console.notice(&err.to_string());
                    }
                }
            }
            Err(err) => console.notice(&err.to_string()),
        }
    }

    let flow = match &cli.script {
        Some(name) => match run_script(&mut interp, name) {
            Ok(flow) => flow,
            Err(ScriptError::Fatal(err)) => {
                interp.session_mut().shutdown();
                return Err(err.into());
            }
            Err(err) => {
                console.notice(&err.to_string());
                Flow::Continue
            }
        },
        None => Flow::Continue,
    };

    if flow == Flow::Continue {
        if let Err(err) = run_repl(&mut interp) {
            interp.session_mut().shutdown();
            return Err(err);
        }
    }

    interp.quit()?;
    std::process::exit(1);
}
