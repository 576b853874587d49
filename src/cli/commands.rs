//! Command table and lookup.

use super::fuzzy::fuzzy_match;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    Connect,
    Help,
    Log,
    Quit,
    SetHelp,
    SetBreak,
    SetEscape,
    SetFlow,
    SetHex,
    SetModem,
    SetNlcr,
    SetPort,
    SetRts,
    SetDtr,
    SetSpeed,
    Shell,
    Show,
}

#[derive(Debug)]
pub struct CommandDef {
    pub name: &'static str,
    pub id: CommandId,
    /// `None` hides the command from help listings.
    pub help: Option<&'static str>,
}

pub const COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "connect",
        id: CommandId::Connect,
        help: Some("connect"),
    },
    CommandDef {
        name: "help",
        id: CommandId::Help,
        help: Some("help or ?"),
    },
    CommandDef {
        name: "log",
        id: CommandId::Log,
        help: Some("log overwrite|append|stop [filename]"),
    },
    CommandDef {
        name: "quit",
        id: CommandId::Quit,
        help: Some("quit"),
    },
    CommandDef {
        name: "set ?",
        id: CommandId::SetHelp,
        help: None,
    },
    CommandDef {
        name: "set break",
        id: CommandId::SetBreak,
        help: Some("set break <duration>"),
    },
    CommandDef {
        name: "set escape",
        id: CommandId::SetEscape,
        help: Some("set escape <character>"),
    },
    CommandDef {
        name: "set flow",
        id: CommandId::SetFlow,
        help: Some("set flow rtscts|none"),
    },
    CommandDef {
        name: "set hex",
        id: CommandId::SetHex,
        help: Some("set hex on|off"),
    },
    CommandDef {
        name: "set modem",
        id: CommandId::SetModem,
        help: Some("set modem on|off"),
    },
    CommandDef {
        name: "set nlcr",
        id: CommandId::SetNlcr,
        help: Some("set nlcr on|off"),
    },
    CommandDef {
        name: "set port",
        id: CommandId::SetPort,
        help: Some("set port <device>"),
    },
    CommandDef {
        name: "set rts",
        id: CommandId::SetRts,
        help: Some("set rts on|off"),
    },
    CommandDef {
        name: "set dtr",
        id: CommandId::SetDtr,
        help: Some("set dtr on|off"),
    },
    CommandDef {
        name: "set speed",
        id: CommandId::SetSpeed,
        help: Some("set speed <speed>"),
    },
    CommandDef {
        name: "shell",
        id: CommandId::Shell,
        help: Some("shell [command] or ![command]"),
    },
    CommandDef {
        name: "show",
        id: CommandId::Show,
        help: Some("show"),
    },
];

#[derive(Debug)]
pub enum Lookup<'a> {
    Found(&'static CommandDef, &'a str),
    Ambiguous(Vec<&'static CommandDef>),
    Unknown,
}

pub fn lookup(line: &str) -> Lookup<'_> {
    let mut found: Option<(&'static CommandDef, &str)> = None;
    for cmd in COMMANDS {
        if let Some(args) = fuzzy_match(cmd.name, line) {
            if found.is_some() {
                return Lookup::Ambiguous(matching(line).collect());
            }
            found = Some((cmd, args));
        }
    }
    match found {
        Some((cmd, args)) => Lookup::Found(cmd, args),
        None => Lookup::Unknown,
    }
}

/// Commands whose name matches `input`, in table order.
pub fn matching(input: &str) -> impl Iterator<Item = &'static CommandDef> + '_ {
    COMMANDS
        .iter()
        .filter(move |cmd| fuzzy_match(cmd.name, input).is_some())
}

/// Help lines ("    <usage>") for every visible command matching `input`.
pub fn help_lines(input: &str) -> Vec<String> {
    matching(input)
        .filter_map(|cmd| cmd.help)
        .map(|help| format!("    {}", help))
        .collect()
}
