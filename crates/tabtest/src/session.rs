//! Session driver.
//!
//! A [`Session`] owns one shell attached to a pty, the drain task feeding
//! its [`OutputSink`], and the per-case input sequence. All synchronization
//! with the shell is by fixed delays: after every step the driver sleeps
//! for the configured inter-step delay and assumes the shell and the
//! terminal driver have caught up. A slow shell shows up as a completion
//! mismatch, not as an error.

use std::time::Duration;

use tabtest_pty::{ExitStatus, PtyChild};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::Sleep;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{HarnessError, Result};
use crate::evaluator::CompletionProbe;
use crate::sink::{DrainHandle, OutputSink};
use crate::types::{ControlChar, DriverState};

/// How long the shell gets to honor `exit` before it is killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// How long teardown waits for the output stream to close after the shell exits.
pub const EOF_GRACE: Duration = Duration::from_secs(2);

/// Line terminator appended by [`Session::send_line`].
const LINE_ENDING: &str = "\n";

/// A live shell session shared by every test case of a run.
///
/// Dropping a session that was not terminated kills the shell and stops
/// the drain task, so early exits never leak the process or the pty.
pub struct Session<W, C>
where
    W: AsyncWrite + Unpin + Send,
    C: PtyChild,
{
    writer: W,
    child: C,
    sink: OutputSink,
    drain: DrainHandle,
    config: SessionConfig,
    state: DriverState,
    terminated: bool,
}

impl<W, C> Session<W, C>
where
    W: AsyncWrite + Unpin + Send,
    C: PtyChild,
{
    /// Assemble a session from a transport and the child attached to it.
    ///
    /// Starts draining `reader` immediately. Must be called from within a
    /// Tokio runtime.
    pub fn new<R>(reader: R, writer: W, child: C, config: SessionConfig) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = OutputSink::new();
        let drain = sink.spawn_drain(reader);
        Self {
            writer,
            child,
            sink,
            drain,
            config,
            state: DriverState::Starting,
            terminated: false,
        }
    }

    /// Get the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the current driver state.
    #[must_use]
    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Get the output sink.
    #[must_use]
    pub const fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Get the shell's process ID.
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.pid()
    }

    fn expect_state(&self, expected: DriverState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(HarnessError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn advance(&mut self, next: DriverState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(HarnessError::InvalidState {
                expected: next.predecessor().unwrap_or(DriverState::Starting),
                actual: self.state,
            });
        }
        debug!(from = %self.state, to = %next, "driver step");
        self.state = next;
        Ok(())
    }

    /// Write bytes to the shell. No acknowledgment is awaited.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        if !self.state.is_open() {
            return Err(HarnessError::SessionClosed);
        }

        self.writer
            .write_all(data)
            .await
            .map_err(|e| HarnessError::io("writing to shell", e))?;
        self.writer
            .flush()
            .await
            .map_err(|e| HarnessError::io("flushing shell input", e))?;
        Ok(())
    }

    /// Write a line to the shell.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        debug!(line, "send line");
        let data = format!("{line}{LINE_ENDING}");
        self.send_raw(data.as_bytes()).await
    }

    /// Write a single control character.
    pub async fn send_control(&mut self, ctrl: ControlChar) -> Result<()> {
        self.send_raw(&[ctrl.as_byte()]).await
    }

    /// Sleep for `duration`, assuming the shell settles meanwhile.
    pub fn wait_settled(duration: Duration) -> Sleep {
        tokio::time::sleep(duration)
    }

    /// Sleep for the configured inter-step delay.
    ///
    /// The returned timer does not borrow the session.
    pub fn settle(&self) -> Sleep {
        Self::wait_settled(self.config.inter_step_delay)
    }

    /// Ask the shell to list completions for the current input line.
    ///
    /// Readline only lists ambiguous completions on the second TAB, so two
    /// are sent back to back.
    pub async fn trigger_completion(&mut self) -> Result<()> {
        let tab = ControlChar::Tab.as_byte();
        self.send_raw(&[tab, tab]).await
    }

    /// Erase `command` from the shell's input line.
    ///
    /// Sends two backspaces per character: one for the typed character and
    /// one for what completion may have appended.
    pub async fn erase_typed_command(&mut self, command: &str) -> Result<()> {
        let count = command.chars().count() * 2;
        debug!(count, "erasing typed command");
        let erase = vec![ControlChar::Backspace.as_byte(); count];
        self.send_raw(&erase).await
    }

    /// Install the prompt marker and source the script under test.
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.expect_state(DriverState::Starting)?;

        Self::wait_settled(self.config.startup_delay).await;
        let prompt = prompt_assignment(self.config.prompt_marker);
        self.send_line(&prompt).await?;
        let source = format!("source {}", self.config.source_path);
        self.send_line(&source).await?;
        self.settle().await;

        info!(script = %self.config.source_path, "shell bootstrapped");
        self.advance(DriverState::Idle)?;
        Ok(())
    }

    /// Run one case's input sequence and return the raw completion output.
    ///
    /// Types `command` without a line terminator, triggers completion,
    /// captures what the shell printed, then erases the command so the
    /// input line is empty for the next case. Steps are separated by the
    /// inter-step delay.
    ///
    /// The sink is reset before typing and again right before the trigger,
    /// so only output produced in response to the trigger is returned.
    pub async fn capture_completion(&mut self, command: &str) -> Result<Vec<u8>> {
        self.expect_state(DriverState::Idle)?;

        self.sink.reset();
        self.send_raw(command.as_bytes()).await?;
        self.advance(DriverState::CommandTyped)?;
        self.settle().await;

        // The echo of the typed command must not end up in the capture.
        self.sink.reset();
        self.trigger_completion().await?;
        self.advance(DriverState::CompletionRequested)?;
        self.settle().await;

        let output = self.sink.take();
        self.advance(DriverState::OutputCaptured)?;
        debug!(bytes = output.len(), "captured completion output");

        self.erase_typed_command(command).await?;
        self.advance(DriverState::Erased)?;
        self.settle().await;

        self.advance(DriverState::Idle)?;
        Ok(output)
    }

    /// Wait for the shell's output stream to end.
    ///
    /// Returns the total number of bytes the session received.
    pub async fn expect_eof(&mut self, timeout: Duration) -> Result<u64> {
        match tokio::time::timeout(timeout, self.drain.finish()).await {
            Ok(Ok(total)) => Ok(total),
            Ok(Err(e)) => Err(HarnessError::io("draining shell output", e)),
            Err(_) => {
                self.drain.abort();
                Err(HarnessError::io(
                    "waiting for end of shell output",
                    std::io::Error::from(std::io::ErrorKind::TimedOut),
                ))
            }
        }
    }

    /// Send `exit`, wait for the shell and release the transport.
    ///
    /// A shell that does not exit within [`SHUTDOWN_GRACE`] is killed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::AbnormalExit`] if the shell exits with a
    /// non-zero status or by a signal.
    pub async fn terminate(mut self) -> Result<ExitStatus> {
        info!(pid = self.pid(), "terminating shell");
        if let Err(e) = self.send_line("exit").await {
            warn!(error = %e, "could not send exit to shell");
        }
        self.advance(DriverState::Closed)?;

        let waited = tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await;
        let status = match waited {
            Ok(result) => result.map_err(HarnessError::WaitFailed)?,
            Err(_) => {
                warn!(grace = ?SHUTDOWN_GRACE, "shell ignored exit, killing it");
                if let Err(e) = self.child.kill() {
                    warn!(error = %e, "failed to kill shell");
                }
                self.child.wait().await.map_err(HarnessError::WaitFailed)?
            }
        };
        self.terminated = true;

        match self.expect_eof(EOF_GRACE).await {
            Ok(total) => debug!(total, "shell output closed"),
            Err(e) => debug!(error = %e, "shell output did not close cleanly"),
        }

        if status.success() {
            info!(%status, "shell exited");
            Ok(status)
        } else {
            warn!(%status, "shell exited abnormally");
            Err(HarnessError::AbnormalExit { status })
        }
    }
}

impl<W, C> Drop for Session<W, C>
where
    W: AsyncWrite + Unpin + Send,
    C: PtyChild,
{
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        if self.child.is_running() {
            match self.child.kill() {
                Ok(()) => warn!(pid = self.child.pid(), "killed shell of an unfinished session"),
                Err(e) => debug!(error = %e, "could not kill shell"),
            }
        }
        self.drain.abort();
    }
}

impl<W, C> std::fmt::Debug for Session<W, C>
where
    W: AsyncWrite + Unpin + Send,
    C: PtyChild,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.child.pid())
            .field("state", &self.state)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl<W, C> CompletionProbe for Session<W, C>
where
    W: AsyncWrite + Unpin + Send,
    C: PtyChild,
{
    async fn capture_completion(&mut self, command: &str) -> Result<Vec<u8>> {
        Self::capture_completion(self, command).await
    }

    async fn terminate(self) -> Result<ExitStatus> {
        Self::terminate(self).await
    }
}

/// The shell line that installs `marker` as the whole prompt.
fn prompt_assignment(marker: char) -> String {
    if marker == '\'' {
        "export PS1=\"'\"".to_string()
    } else {
        format!("export PS1='{marker}'")
    }
}

#[cfg(unix)]
mod spawn {
    use tabtest_pty::{PtyConfig, PtyPair, PtyWriter, UnixPtyChild, spawn_child};
    use tracing::info;

    use super::Session;
    use crate::config::SessionConfig;
    use crate::error::{HarnessError, Result};

    /// A session driving a real shell through a pty.
    pub type PtySession = Session<PtyWriter, UnixPtyChild>;

    impl Session<PtyWriter, UnixPtyChild> {
        /// Allocate a pty and launch the configured shell on it.
        ///
        /// The shell's stdin, stdout and stderr are all bound to the slave
        /// end; the session keeps the master. Must be called from within a
        /// Tokio runtime.
        ///
        /// # Errors
        ///
        /// [`HarnessError::TransportUnavailable`] if no pty can be
        /// allocated, [`HarnessError::SpawnFailed`] if the shell cannot be
        /// launched.
        pub fn spawn(config: SessionConfig) -> Result<Self> {
            let pty_config = PtyConfig::default();
            let pair = PtyPair::open(pty_config.window_size)
                .map_err(HarnessError::TransportUnavailable)?;
            let child = spawn_child(pair.slave, &config.shell, &config.shell_args, &pty_config)
                .map_err(|e| HarnessError::from_spawn(&config.shell, e))?;

            info!(pid = child.pid(), shell = %config.shell, "shell spawned");
            let (reader, writer) = pair.master.into_split();
            Ok(Self::new(reader, writer, child, config))
        }
    }
}

#[cfg(unix)]
pub use spawn::PtySession;
