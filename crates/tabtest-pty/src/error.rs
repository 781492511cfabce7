//! Error types for the tabtest-pty crate.
//!
//! Every fallible operation on the transport returns [`PtyError`]. The
//! variants separate allocation failures (the harness cannot run at all)
//! from failures of the attached child process.

use std::io;

/// The error type for PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// The platform could not allocate a master/slave pair.
    #[error("failed to create PTY: {0}")]
    Create(#[source] io::Error),

    /// The child process could not be launched on the slave end.
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    /// The initial window size could not be applied.
    #[error("failed to resize PTY: {0}")]
    Resize(#[source] io::Error),

    /// Failed to send a signal to the child process.
    #[error("failed to send signal: {0}")]
    Signal(#[source] io::Error),

    /// Failed to wait for the child process.
    #[error("failed to wait for child: {0}")]
    Wait(#[source] io::Error),
}

impl PtyError {
    /// Returns true if this error comes from allocating the terminal pair.
    #[must_use]
    pub const fn is_allocation(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Resize(_))
    }
}

/// A specialized Result type for PTY operations.
pub type Result<T> = std::result::Result<T, PtyError>;

/// Convert an errno into an `io::Error`.
#[cfg(unix)]
pub(crate) fn os_error(errno: rustix::io::Errno) -> io::Error {
    io::Error::from_raw_os_error(errno.raw_os_error())
}

/// Convert an errno into an allocation error.
#[cfg(unix)]
pub(crate) fn create_error(errno: rustix::io::Errno) -> PtyError {
    PtyError::Create(os_error(errno))
}
