//! Child processes attached to the slave end of a PTY.

use std::ffi::OsStr;
use std::future::Future;
use std::io;
use std::os::unix::io::{AsRawFd, OwnedFd};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use rustix::process::{Pid, Signal, kill_process};
use tokio::process::{Child as TokioChild, Command};
use tokio::sync::Mutex;

use crate::config::PtyConfig;
use crate::error::{PtyError, Result, os_error};
use crate::traits::{ExitStatus, PtyChild};

/// Unix child process handle.
///
/// The process is killed if the handle is dropped before it has been
/// reaped, so an aborted run never leaves a shell behind.
pub struct UnixPtyChild {
    child: Mutex<TokioChild>,
    pid: u32,
    running: AtomicBool,
    exit_status: Option<ExitStatus>,
}

impl std::fmt::Debug for UnixPtyChild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixPtyChild")
            .field("pid", &self.pid)
            .field("running", &self.running.load(Ordering::SeqCst))
            .field("exit_status", &self.exit_status)
            .finish()
    }
}

impl UnixPtyChild {
    fn new(child: TokioChild) -> Result<Self> {
        let pid = child.id().ok_or_else(|| {
            PtyError::Spawn(io::Error::other("child exited before its pid was read"))
        })?;
        Ok(Self {
            child: Mutex::new(child),
            pid,
            running: AtomicBool::new(true),
            exit_status: None,
        })
    }

    /// Get the process ID.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Check if the process is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait for the child process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }

        let status = self.child.get_mut().wait().await.map_err(PtyError::Wait)?;
        Ok(self.record(status))
    }

    /// Deliver SIGKILL. Does nothing once the process has been reaped.
    pub fn kill(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        let pid = Pid::from_raw(self.pid as i32).ok_or_else(|| {
            PtyError::Signal(io::Error::new(io::ErrorKind::InvalidInput, "invalid pid"))
        })?;
        kill_process(pid, Signal::KILL).map_err(|e| PtyError::Signal(os_error(e)))
    }

    fn record(&mut self, status: std::process::ExitStatus) -> ExitStatus {
        let status = convert_exit_status(status);
        self.running.store(false, Ordering::SeqCst);
        self.exit_status = Some(status);
        tracing::debug!(pid = self.pid, %status, "child reaped");
        status
    }
}

impl PtyChild for UnixPtyChild {
    fn pid(&self) -> u32 {
        Self::pid(self)
    }

    fn is_running(&self) -> bool {
        Self::is_running(self)
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitStatus>> + Send + '_>> {
        Box::pin(Self::wait(self))
    }

    fn kill(&mut self) -> Result<()> {
        Self::kill(self)
    }
}

fn convert_exit_status(status: std::process::ExitStatus) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    if let Some(code) = status.code() {
        ExitStatus::Exited(code)
    } else if let Some(signal) = status.signal() {
        ExitStatus::Signaled(signal)
    } else {
        ExitStatus::Exited(-1)
    }
}

/// Launch `program` with all three stdio streams on `slave`.
///
/// The child gets a new session with the slave as its controlling
/// terminal (when `config.controlling_terminal` is set). The caller's copy
/// of `slave` is closed on return so the master sees EOF once the child
/// exits.
///
/// # Errors
///
/// Returns [`PtyError::Spawn`] if the program cannot be launched.
pub fn spawn_child<S, I>(
    slave: OwnedFd,
    program: S,
    args: I,
    config: &PtyConfig,
) -> Result<UnixPtyChild>
where
    S: AsRef<OsStr>,
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    cmd.kill_on_drop(true);

    cmd.stdin(Stdio::from(slave.try_clone().map_err(PtyError::Spawn)?));
    cmd.stdout(Stdio::from(slave.try_clone().map_err(PtyError::Spawn)?));
    cmd.stderr(Stdio::from(slave.try_clone().map_err(PtyError::Spawn)?));

    if config.controlling_terminal {
        let slave_raw = slave.as_raw_fd();
        // SAFETY: setsid and ioctl are async-signal-safe, and slave_raw stays
        // open in the child until exec.
        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(move || {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                if libc::ioctl(slave_raw, libc::TIOCSCTTY, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let child = cmd.spawn().map_err(PtyError::Spawn)?;
    drop(slave);

    let child = UnixPtyChild::new(child)?;
    tracing::debug!(pid = child.pid(), program = ?program.as_ref(), "spawned child on pty");
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowSize;
    use crate::unix::PtyPair;

    #[tokio::test]
    async fn exit_code_is_reported() {
        let pair = PtyPair::open(WindowSize::new(80, 24)).unwrap();
        let mut child =
            spawn_child(pair.slave, "/bin/sh", ["-c", "exit 3"], &PtyConfig::default()).unwrap();

        let status = child.wait().await.unwrap();
        assert_eq!(status, ExitStatus::Exited(3));
        assert!(!child.is_running());
        // Cached after the first wait.
        assert_eq!(child.wait().await.unwrap(), ExitStatus::Exited(3));
        // Killing a reaped child is a no-op.
        child.kill().unwrap();
    }

    #[tokio::test]
    async fn kill_reports_signal() {
        let pair = PtyPair::open(WindowSize::new(80, 24)).unwrap();
        let mut child =
            spawn_child(pair.slave, "/bin/sh", ["-c", "sleep 30"], &PtyConfig::default())
                .unwrap();
        assert!(child.is_running());

        PtyChild::kill(&mut child).unwrap();
        assert!(child.is_running());
        let status = child.wait().await.unwrap();
        assert_eq!(status.signal(), Some(libc::SIGKILL));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let pair = PtyPair::open(WindowSize::new(80, 24)).unwrap();
        let result = spawn_child(
            pair.slave,
            "/nonexistent/tabtest-shell",
            std::iter::empty::<&str>(),
            &PtyConfig::default(),
        );
        assert!(matches!(result, Err(PtyError::Spawn(_))));
    }
}
