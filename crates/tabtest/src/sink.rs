//! Output sink fed by a background drain task.
//!
//! The drain task is the only producer: it reads the transport until EOF
//! and appends every chunk. The driver is the only consumer and uses
//! [`OutputSink::reset`] and [`OutputSink::take`]; each of those holds the
//! lock for its whole operation, so an append lands either before or after
//! it, never in the middle.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Read size used by the drain task.
const READ_CHUNK: usize = 4096;

#[derive(Debug, Default)]
struct SinkState {
    data: Vec<u8>,
    total_written: u64,
    closed: bool,
}

/// Append-only capture buffer shared between the drain task and the driver.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    state: Arc<Mutex<SinkState>>,
}

impl OutputSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append bytes.
    pub fn append(&self, data: &[u8]) {
        let mut state = self.lock();
        state.data.extend_from_slice(data);
        state.total_written += data.len() as u64;
    }

    /// Copy of everything appended since the last reset.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().data.clone()
    }

    /// Discard everything appended so far.
    pub fn reset(&self) {
        self.lock().data.clear();
    }

    /// Snapshot and reset in one critical section.
    #[must_use]
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().data)
    }

    /// Number of bytes currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    /// Returns true if nothing has been appended since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().data.is_empty()
    }

    /// Total bytes appended over the sink's lifetime.
    #[must_use]
    pub fn total_written(&self) -> u64 {
        self.lock().total_written
    }

    /// Returns true once the drain task has seen the end of the stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn close(&self) {
        self.lock().closed = true;
    }

    /// Start a task that drains `reader` into this sink until EOF.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_drain<R>(&self, mut reader: R) -> DrainHandle
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let sink = self.clone();
        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; READ_CHUNK];
            let result = loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break Ok(sink.total_written()),
                    Ok(n) => {
                        tracing::trace!(bytes = n, "drained output");
                        sink.append(&buf[..n]);
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => break Err(e),
                }
            };
            sink.close();
            tracing::debug!(total = sink.total_written(), "drain finished");
            result
        });

        DrainHandle { task: Some(task) }
    }
}

/// Handle to the drain task. The task is aborted when the handle is dropped.
#[derive(Debug)]
pub struct DrainHandle {
    task: Option<JoinHandle<io::Result<u64>>>,
}

impl DrainHandle {
    /// Returns true if the task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the task to reach the end of the stream.
    ///
    /// Returns the total number of bytes drained.
    pub async fn finish(&mut self) -> io::Result<u64> {
        let Some(task) = self.task.take() else {
            return Ok(0);
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "drain task cancelled",
            )),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    /// Stop the task without waiting for EOF.
    pub fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for DrainHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
