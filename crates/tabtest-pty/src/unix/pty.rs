//! Unix PTY allocation and the master end.
//!
//! [`PtyPair::open`] allocates both ends. The master is registered with the
//! Tokio reactor and split into a reader and a writer sharing the same
//! descriptor, so one task can drain output while another types input.

use std::io;
use std::os::unix::io::OwnedFd;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustix::fs::{Mode, OFlags, fcntl_setfl, open};
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use rustix::termios::{Winsize, tcsetwinsize};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::config::WindowSize;
use crate::error::{PtyError, Result, create_error, os_error};

/// A freshly allocated master/slave pair.
///
/// The slave is held until a child is attached to it; dropping the pair
/// without attaching anything closes both ends.
#[derive(Debug)]
pub struct PtyPair {
    /// The master end.
    pub master: UnixPtyMaster,
    /// The slave end, to be handed to the child.
    pub slave: OwnedFd,
    /// Path of the slave device.
    pub slave_path: String,
}

impl PtyPair {
    /// Allocate a new pair with the given initial window size.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`PtyError::Create`] if the platform cannot allocate a pair,
    /// [`PtyError::Resize`] if the window size is rejected.
    pub fn open(size: WindowSize) -> Result<Self> {
        let master_fd = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).map_err(create_error)?;
        grantpt(&master_fd).map_err(create_error)?;
        unlockpt(&master_fd).map_err(create_error)?;

        let slave_name = ptsname(&master_fd, Vec::new()).map_err(create_error)?;
        let slave_path = slave_name
            .to_str()
            .map_err(|_| {
                PtyError::Create(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid slave path encoding",
                ))
            })?
            .to_string();

        let slave = open(
            Path::new(&slave_path),
            OFlags::RDWR | OFlags::NOCTTY,
            Mode::empty(),
        )
        .map_err(create_error)?;

        fcntl_setfl(&master_fd, OFlags::NONBLOCK).map_err(create_error)?;
        let master = UnixPtyMaster {
            fd: AsyncFd::new(master_fd).map_err(PtyError::Create)?,
        };
        master.set_window_size(size)?;

        tracing::debug!(
            slave = %slave_path,
            cols = size.cols,
            rows = size.rows,
            "allocated pty pair"
        );

        Ok(Self {
            master,
            slave,
            slave_path,
        })
    }
}

/// The master end of a pair, before it is split.
#[derive(Debug)]
pub struct UnixPtyMaster {
    fd: AsyncFd<OwnedFd>,
}

impl UnixPtyMaster {
    /// Set the terminal window size seen by the child.
    pub fn set_window_size(&self, size: WindowSize) -> Result<()> {
        let winsize = Winsize {
            ws_col: size.cols,
            ws_row: size.rows,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        tcsetwinsize(self.fd.get_ref(), winsize).map_err(|e| PtyError::Resize(os_error(e)))
    }

    /// Split into a reader and a writer that can be used from different tasks.
    #[must_use]
    pub fn into_split(self) -> (PtyReader, PtyWriter) {
        let fd = Arc::new(self.fd);
        (
            PtyReader {
                fd: Arc::clone(&fd),
            },
            PtyWriter { fd },
        )
    }
}

/// Read half of a split master. Yields EOF once every slave descriptor is closed.
#[derive(Debug)]
pub struct PtyReader {
    fd: Arc<AsyncFd<OwnedFd>>,
}

/// Write half of a split master. Bytes written here reach the child's stdin.
#[derive(Debug)]
pub struct PtyWriter {
    fd: Arc<AsyncFd<OwnedFd>>,
}

impl AsyncRead for PtyReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = match self.fd.poll_read_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            let unfilled = buf.initialize_unfilled();
            match rustix::io::read(self.fd.get_ref(), unfilled) {
                Ok(n) => {
                    buf.advance(n);
                    return Poll::Ready(Ok(()));
                }
                Err(rustix::io::Errno::AGAIN) => guard.clear_ready(),
                // Linux reports EIO once every slave descriptor is closed.
                Err(rustix::io::Errno::IO) => return Poll::Ready(Ok(())),
                Err(e) => return Poll::Ready(Err(os_error(e))),
            }
        }
    }
}

impl AsyncWrite for PtyWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = match self.fd.poll_write_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            };

            match rustix::io::write(self.fd.get_ref(), buf) {
                Ok(n) => return Poll::Ready(Ok(n)),
                Err(rustix::io::Errno::AGAIN) => guard.clear_ready(),
                Err(e) => return Poll::Ready(Err(os_error(e))),
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
