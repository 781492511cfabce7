//! The child-process seam.
//!
//! Code that drives a shell depends on [`PtyChild`] rather than on
//! [`crate::UnixPtyChild`], so it can run against an in-memory child.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;

/// Handle for a process attached to a PTY.
pub trait PtyChild: Send + Sync {
    /// Process ID.
    fn pid(&self) -> u32;

    /// False once the process has been reaped.
    fn is_running(&self) -> bool;

    /// Wait for the process to exit and reap it.
    ///
    /// Calling it again after the process was reaped returns the cached status.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>>;

    /// Deliver SIGKILL. A no-op once the process has been reaped.
    fn kill(&mut self) -> Result<()>;
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal exit with a status code.
    Exited(i32),

    /// Killed by a signal.
    Signaled(i32),
}

impl ExitStatus {
    /// Only `Exited(0)` counts as success.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Exit code of a normal exit.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::Signaled(_) => None,
        }
    }

    /// Signal number of a killed process.
    #[must_use]
    pub const fn signal(&self) -> Option<i32> {
        match self {
            Self::Signaled(sig) => Some(*sig),
            Self::Exited(_) => None,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(sig) => write!(f, "terminated by signal {sig}"),
        }
    }
}
