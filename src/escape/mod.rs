//! In-band escape sequence recognizer.
//!
//! Console bytes pass through a two-state machine:
//! - `state.rs` - `Idle` / `Pending`
//! - `action.rs` - control actions selected after the escape byte
//! - `reducer.rs` - transitions (pure, no I/O)

mod action;
mod reducer;
mod state;

pub use action::ControlAction;
pub use reducer::{EscapeOutput, EscapeReducer};
pub use state::EscapeState;

/// Ctrl-\
pub const DEFAULT_ESCAPE_CHAR: u8 = 0x1c;

/// Render the escape character the way the help text refers to it.
pub fn describe_escape(escape_char: u8) -> String {
    format!("\\{:03o}", escape_char)
}
