//! Error types for tabtest.
//!
//! Every error here is fatal to a run. Completion mismatches are not
//! errors: they are recorded as [`crate::evaluator::CaseOutcome`] values
//! and only end a run under the stop-after-first-fail policy.

use std::path::PathBuf;

use tabtest_pty::{ExitStatus, PtyError};
use thiserror::Error;

use crate::types::DriverState;

/// Process exit code for a run with failing cases or an abnormal shell exit.
pub const EXIT_FAILURE: u8 = 1;

/// Process exit code for configuration, pty or spawn failures.
pub const EXIT_SETUP: u8 = 2;

/// Why a configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigSource {
    /// The file could not be read.
    #[error("{0}")]
    Read(#[from] std::io::Error),

    /// The file is not a valid suite document.
    #[error("{0}")]
    Parse(#[from] toml::de::Error),
}

/// The main error type for tabtest.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The configuration file is unreadable or malformed.
    #[error("failed to load config {}: {source}", path.display())]
    ConfigLoad {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying read or parse failure.
        #[source]
        source: ConfigSource,
    },

    /// The configuration parsed but describes an unusable suite.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// What is wrong with it.
        message: String,
    },

    /// No pseudo-terminal could be allocated.
    #[error("terminal unavailable: {0}")]
    TransportUnavailable(#[source] PtyError),

    /// The shell could not be launched.
    #[error("failed to spawn shell '{shell}': {source}")]
    SpawnFailed {
        /// The shell executable.
        shell: String,
        /// The underlying error.
        #[source]
        source: PtyError,
    },

    /// The shell exited with a failure status during teardown.
    #[error("shell exited abnormally: {status}")]
    AbnormalExit {
        /// The reported exit status.
        status: ExitStatus,
    },

    /// Waiting for the shell failed.
    #[error("failed to wait for shell: {0}")]
    WaitFailed(#[source] PtyError),

    /// A driver step was attempted out of sequence.
    #[error("driver is {actual}, expected {expected}")]
    InvalidState {
        /// The state the step requires.
        expected: DriverState,
        /// The state the driver is in.
        actual: DriverState,
    },

    /// Input was sent after the session was closed.
    #[error("session is closed")]
    SessionClosed,

    /// An I/O error with context.
    #[error("{context}: {source}")]
    Io {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Map a pty failure raised while spawning `shell`.
    #[must_use]
    pub fn from_spawn(shell: &str, err: PtyError) -> Self {
        if err.is_allocation() {
            Self::TransportUnavailable(err)
        } else {
            Self::SpawnFailed {
                shell: shell.to_string(),
                source: err,
            }
        }
    }

    /// Returns true if the error happened before any case could run.
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. }
                | Self::InvalidConfig { .. }
                | Self::TransportUnavailable(_)
                | Self::SpawnFailed { .. }
        )
    }

    /// The process exit code this error should produce.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.is_setup() {
            EXIT_SETUP
        } else {
            EXIT_FAILURE
        }
    }
}

/// Result type alias for tabtest operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
