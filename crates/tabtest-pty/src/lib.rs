//! tabtest-pty: async pseudo-terminal transport
//!
//! Allocates a master/slave pair, attaches a child process to the slave as
//! its controlling terminal and exposes the master as async byte streams.
//! Bytes written to the master arrive on the child's stdin; everything the
//! child prints on stdout or stderr is readable from the master.
//!
//! # Quick Start
//!
//! ```ignore
//! use tabtest_pty::{PtyConfig, PtyPair, spawn_child};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! let config = PtyConfig::default();
//! let pair = PtyPair::open(config.window_size)?;
//! let mut child = spawn_child(pair.slave, "bash", ["--norc"], &config)?;
//! let (mut reader, mut writer) = pair.master.into_split();
//! writer.write_all(b"exit\n").await?;
//! let mut output = Vec::new();
//! reader.read_to_end(&mut output).await?;
//! child.wait().await?;
//! ```
//!
//! Only Unix platforms are supported.

pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod unix;

pub use config::{PtyConfig, WindowSize};
pub use error::{PtyError, Result};
pub use traits::{ExitStatus, PtyChild};

#[cfg(unix)]
pub use unix::{PtyPair, PtyReader, PtyWriter, UnixPtyChild, UnixPtyMaster, spawn_child};
