//! Control actions selected by the byte after the escape character.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// `h` or `?`
    ShowHelp,
    /// `!`
    StartShell,
    /// `c`: leave the relay, keep the device open.
    ReturnToPrompt,
    /// `b`
    SendBreak,
    /// `q`: leave the program.
    Quit,
    /// The escape character twice in a row.
    SendLiteralEscape,
    /// Anything else; answered with a bell.
    Unknown,
}

impl ControlAction {
    /// Case-insensitive lookup of a control character. Does not know about
    /// the escape character itself; the reducer handles that first.
    pub fn from_byte(byte: u8) -> Self {
        match byte.to_ascii_lowercase() {
            b'h' | b'?' => Self::ShowHelp,
            b'!' => Self::StartShell,
            b'c' => Self::ReturnToPrompt,
            b'b' => Self::SendBreak,
            b'q' => Self::Quit,
            _ => Self::Unknown,
        }
    }

    /// Actions after which the operator lands back in the escape sub-prompt
    /// instead of the data stream.
    pub fn returns_to_subprompt(&self) -> bool {
        matches!(self, Self::ShowHelp | Self::StartShell)
    }
}
