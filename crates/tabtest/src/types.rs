//! Common types for tabtest.

use std::fmt;

/// Control characters the driver types into the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlChar {
    /// Ctrl+H (BS), readline's backward-delete-char.
    Backspace,
    /// Ctrl+I (HT), readline's complete.
    Tab,
}

impl ControlChar {
    /// Get the byte value of this control character.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Backspace => 0x08,
            Self::Tab => 0x09,
        }
    }
}

/// Where the driver is in the per-case sequence.
///
/// Every case walks
/// `Idle -> CommandTyped -> CompletionRequested -> OutputCaptured -> Erased -> Idle`;
/// the shared shell's input line is only guaranteed empty in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    /// Spawned, bootstrap not sent yet.
    #[default]
    Starting,
    /// Input line empty, ready for the next case.
    Idle,
    /// The partial command has been typed.
    CommandTyped,
    /// The completion trigger has been sent.
    CompletionRequested,
    /// The completion output has been taken from the sink.
    OutputCaptured,
    /// The typed command has been erased.
    Erased,
    /// `exit` sent; the session is shutting down.
    Closed,
}

impl DriverState {
    /// The state that must precede `self` in the per-case sequence.
    #[must_use]
    pub const fn predecessor(self) -> Option<Self> {
        match self {
            Self::CommandTyped => Some(Self::Idle),
            Self::CompletionRequested => Some(Self::CommandTyped),
            Self::OutputCaptured => Some(Self::CompletionRequested),
            Self::Erased => Some(Self::OutputCaptured),
            Self::Idle => Some(Self::Erased),
            Self::Starting | Self::Closed => None,
        }
    }

    /// Check if the driver may step from `self` to `next`.
    ///
    /// Bootstrap moves `Starting` to `Idle`, and any state may close.
    /// Every other step must follow the per-case sequence.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (_, Self::Closed) | (Self::Starting, Self::Idle) => true,
            _ => next.predecessor() == Some(self),
        }
    }

    /// Check if the session accepts input in this state.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Idle => "idle",
            Self::CommandTyped => "command-typed",
            Self::CompletionRequested => "completion-requested",
            Self::OutputCaptured => "output-captured",
            Self::Erased => "erased",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
