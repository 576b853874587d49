//! State for the escape sequence recognizer.

/// Whether the previous console byte was the escape character.
///
/// `Pending` lives only between the escape byte and the very next console
/// byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeState {
    /// Console bytes go to the device.
    #[default]
    Idle,

    /// Escape byte consumed, waiting for the control character.
    Pending,
}
