//! Reducer for the escape sequence recognizer.

use super::action::ControlAction;
use super::state::EscapeState;

/// What the relay loop has to do with one console byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeOutput {
    /// Byte swallowed (it was the escape character).
    Consumed,
    /// Send the byte to the device, if one is connected.
    Forward(u8),
    /// Run a control action.
    Control(ControlAction),
}

/// Pure transition function; every side effect belongs to the caller.
pub struct EscapeReducer;

impl EscapeReducer {
    pub fn reduce(state: EscapeState, byte: u8, escape_char: u8) -> (EscapeState, EscapeOutput) {
        match state {
            EscapeState::Idle if byte == escape_char => {
                (EscapeState::Pending, EscapeOutput::Consumed)
            }
            EscapeState::Idle => (EscapeState::Idle, EscapeOutput::Forward(byte)),
            EscapeState::Pending if byte == escape_char => (
                EscapeState::Idle,
                EscapeOutput::Control(ControlAction::SendLiteralEscape),
            ),
            EscapeState::Pending => (
                EscapeState::Idle,
                EscapeOutput::Control(ControlAction::from_byte(byte)),
            ),
        }
    }
}
