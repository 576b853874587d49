use std::io::Write;
use std::process::Command;

use super::commands::{help_lines, lookup, CommandId, Lookup};
use super::fuzzy::{fuzzy_match, is_prefix_ignore_case, parse_switch};
use super::{CommandError, Flow};
use crate::device::attrs;
use crate::device::{ConnectionState, DeviceError, FlowControl, ModemLine};
use crate::relay::{self, Console, LogMode, RelayOutcome};
use crate::session::{Session, MAX_BREAK_DURATION};

/// Log file used when `log overwrite|append` names none.
pub const DEFAULT_LOG_FILE: &str = "tt.log";

/// Executes command lines against the session.
///
/// Command output goes to `out`; diagnostics are returned as
/// [`CommandError`] for the caller to report.
pub struct Interpreter<W: Write> {
    session: Session,
    console: Console,
    out: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(session: Session, console: Console, out: W) -> Self {
        Self {
            session,
            console,
            out,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn out(&self) -> &W {
        &self.out
    }

    pub fn out_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Run one command line.
    pub fn handle(&mut self, line: &str) -> Result<Flow, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        if let Some(rest) = line.strip_prefix('?') {
            return self.help(rest.trim());
        }
        if let Some(rest) = line.strip_prefix('!') {
            return self.shell(rest.trim());
        }

        match lookup(line) {
            Lookup::Found(cmd, args) => {
                tracing::debug!(command = cmd.name, args, "dispatch");
                self.dispatch(cmd.id, args)
            }
            Lookup::Ambiguous(cmds) => {
                let lines: Vec<String> = cmds
                    .iter()
                    .filter_map(|cmd| cmd.help)
                    .map(|help| format!("    {}", help))
                    .collect();
                Err(CommandError::Ambiguous(lines.join("\n")))
            }
            Lookup::Unknown => Err(CommandError::Unknown(line.to_string())),
        }
    }

    /// Report a failed command on the console error channel.
    pub fn report(&self, err: &CommandError) {
        for line in err.to_string().lines() {
            self.console.notice(line);
        }
    }

    /// Close the device and the log, say goodbye.
    pub fn quit(&mut self) -> Result<(), CommandError> {
        if self.session.shutdown() {
            writeln!(self.out, "Logging stopped")?;
        }
        writeln!(self.out, "Bye!")?;
        self.out.flush()?;
        Ok(())
    }

    fn dispatch(&mut self, id: CommandId, args: &str) -> Result<Flow, CommandError> {
        match id {
            CommandId::Connect => self.connect(),
            CommandId::Help => self.help(args),
            CommandId::Log => self.log(args),
            CommandId::Quit => Ok(Flow::Quit),
            CommandId::SetHelp => self.help("set"),
            CommandId::SetBreak => self.set_break(args),
            CommandId::SetEscape => self.set_escape(args),
            CommandId::SetFlow => self.set_flow(args),
            CommandId::SetHex => {
                self.session.settings.hex_trace = switch(args, "set hex")?;
                Ok(Flow::Continue)
            }
            CommandId::SetModem => {
                let on = switch(args, "set modem")?;
                attrs::set_modem_control(&self.session.device, on)?;
                Ok(Flow::Continue)
            }
            CommandId::SetNlcr => {
                self.session.settings.translate_newlines = switch(args, "set nlcr")?;
                Ok(Flow::Continue)
            }
            CommandId::SetPort => self.set_port(args),
            CommandId::SetRts => self.set_line(args, ModemLine::Rts, "set rts"),
            CommandId::SetDtr => self.set_line(args, ModemLine::Dtr, "set dtr"),
            CommandId::SetSpeed => self.set_speed(args),
            CommandId::Shell => self.shell(args),
            CommandId::Show => self.show(),
        }
    }

    fn connect(&mut self) -> Result<Flow, CommandError> {
        match relay::connect(&mut self.session, &self.console)? {
            RelayOutcome::Terminated => Ok(Flow::Quit),
            RelayOutcome::ClosedByOperator => {
                self.console.notice("\r\nBack at command prompt");
                Ok(Flow::Continue)
            }
        }
    }

    fn help(&mut self, args: &str) -> Result<Flow, CommandError> {
        for line in help_lines(args) {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out)?;
        Ok(Flow::Continue)
    }

    fn log(&mut self, args: &str) -> Result<Flow, CommandError> {
        if wants_usage(args) {
            return Err(CommandError::Usage(
                "log overwrite|append|stop <filename>".to_string(),
            ));
        }

        if fuzzy_match("stop", args).is_some() {
            match self.session.stop_log() {
                Some(_) => writeln!(self.out, "Logging stopped")?,
                None => writeln!(self.out, "No log active")?,
            }
            return Ok(Flow::Continue);
        }

        let (mode, file) = if let Some(file) = fuzzy_match("overwrite", args) {
            (LogMode::Overwrite, file)
        } else if let Some(file) = fuzzy_match("append", args) {
            (LogMode::Append, file)
        } else {
            return Err(CommandError::InvalidParameter("log"));
        };
        let file = if file.is_empty() { DEFAULT_LOG_FILE } else { file };

        if self.session.stop_log().is_some() {
            writeln!(self.out, "Logging stopped")?;
        }
        self.session
            .start_log(file, mode)
            .map_err(|source| CommandError::Log {
                path: file.into(),
                source,
            })?;
        writeln!(self.out, "Logging started to \"{}\"", file)?;
        Ok(Flow::Continue)
    }

    fn set_break(&mut self, args: &str) -> Result<Flow, CommandError> {
        if wants_usage(args) {
            return Err(CommandError::Usage(format!(
                "set break <duration>\nWhere duration is in 1/10 seconds from 1 to {}",
                MAX_BREAK_DURATION
            )));
        }
        match args.parse::<u32>() {
            Ok(tenths) if (1..=MAX_BREAK_DURATION).contains(&tenths) => {
                self.session.settings.break_duration = tenths;
                Ok(Flow::Continue)
            }
            _ => Err(CommandError::InvalidParameter("set break")),
        }
    }

    fn set_escape(&mut self, args: &str) -> Result<Flow, CommandError> {
        if wants_usage(args) {
            return Err(CommandError::Usage(
                "set escape <character>\nWhere character is an ASCII value from 0 to 255"
                    .to_string(),
            ));
        }
        let escape_char = args
            .parse::<u8>()
            .map_err(|_| CommandError::InvalidParameter("set escape"))?;
        self.session.settings.escape_char = escape_char;
        Ok(Flow::Continue)
    }

    fn set_flow(&mut self, args: &str) -> Result<Flow, CommandError> {
        if wants_usage(args) {
            return Err(CommandError::Usage("set flow rtscts|none".to_string()));
        }
        let word = args.split_whitespace().next().unwrap_or_default();
        let flow = if is_prefix_ignore_case(word, "none") {
            FlowControl::None
        } else if is_prefix_ignore_case(word, "rtscts") {
            FlowControl::RtsCts
        } else {
            return Err(CommandError::InvalidParameter("set flow"));
        };
        attrs::set_flow_control(&self.session.device, flow)?;
        Ok(Flow::Continue)
    }

    fn set_port(&mut self, args: &str) -> Result<Flow, CommandError> {
        if wants_usage(args) {
            return Err(CommandError::Usage("set port <device>".to_string()));
        }
        self.session.device.select(args)?;
        Ok(Flow::Continue)
    }

    fn set_line(
        &mut self,
        args: &str,
        line: ModemLine,
        command: &'static str,
    ) -> Result<Flow, CommandError> {
        let on = switch(args, command)?;
        attrs::set_modem_line(&self.session.device, line, on)?;
        Ok(Flow::Continue)
    }

    fn set_speed(&mut self, args: &str) -> Result<Flow, CommandError> {
        if wants_usage(args) {
            return Err(CommandError::Usage(speed_usage()));
        }
        let speed = args
            .parse::<u32>()
            .map_err(|_| CommandError::InvalidParameter("set speed"))?;
        match attrs::set_speed(&self.session.device, speed) {
            Err(DeviceError::UnsupportedSpeed(_)) => {
                Err(CommandError::InvalidParameter("set speed"))
            }
            other => {
                other?;
                Ok(Flow::Continue)
            }
        }
    }

    fn shell(&mut self, args: &str) -> Result<Flow, CommandError> {
        self.out.flush()?;
        let status = if args.is_empty() {
            let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
            Command::new(shell).status()
        } else {
            Command::new("/bin/sh").arg("-c").arg(args).status()
        }
        .map_err(CommandError::Shell)?;

        if status.success() {
            Ok(Flow::Continue)
        } else {
            Err(CommandError::ShellStatus(status))
        }
    }

    fn show(&mut self) -> Result<Flow, CommandError> {
        let settings = &self.session.settings;
        writeln!(self.out, "global settings:")?;
        writeln!(
            self.out,
            "    break-duration: {} (1/10 seconds)",
            settings.break_duration
        )?;
        writeln!(self.out, "    escape-char: {}", settings.escape_char)?;
        writeln!(self.out, "    hex: {}", on_off(settings.hex_trace))?;
        writeln!(self.out, "    nlcr: {}", on_off(settings.translate_newlines))?;
        writeln!(self.out)?;

        writeln!(self.out, "port settings:")?;
        let device = &self.session.device;
        match (device.state(), device.path()) {
            (ConnectionState::Connected, Some(path)) => {
                let port = attrs::read_port_settings(device)?;
                writeln!(self.out, "    port:   {}", path.display())?;
                match port.speed {
                    Some(speed) => writeln!(self.out, "    speed:  {}", speed)?,
                    None => writeln!(self.out, "    speed:  unknown")?,
                }
                let flow = match port.flow {
                    FlowControl::RtsCts => "rtscts",
                    FlowControl::None => "none",
                };
                writeln!(self.out, "    flow:   {}", flow)?;
                writeln!(self.out, "    modem:  {}", on_off(port.modem))?;
            }
            (_, Some(path)) => {
                writeln!(self.out, "    port:   {} (not connected)", path.display())?;
            }
            (_, None) => writeln!(self.out, "    no port selected")?,
        }
        writeln!(self.out)?;
        Ok(Flow::Continue)
    }
}

fn wants_usage(args: &str) -> bool {
    args.is_empty() || args.starts_with('?')
}

fn switch(args: &str, command: &'static str) -> Result<bool, CommandError> {
    if wants_usage(args) {
        return Err(CommandError::Usage(format!("{} on|off", command)));
    }
    parse_switch(args).ok_or(CommandError::InvalidParameter(command))
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Usage text for `set speed`, ten speeds per line.
fn speed_usage() -> String {
    let mut text = String::from("set speed <speed>\nWhere speed is one of:");
    let speeds: Vec<String> = attrs::supported_speeds()
        .map(|baud| baud.to_string())
        .collect();
    for chunk in speeds.chunks(10) {
        text.push_str("\n    ");
        text.push_str(&chunk.join(", "));
    }
    text
}
