//! Unix platform implementation.
//!
//! - Pair allocation via `openpt`/`grantpt`/`unlockpt` ([`PtyPair`])
//! - Async master I/O through tokio's `AsyncFd` ([`PtyReader`], [`PtyWriter`])
//! - Child launch with a new session and the slave as controlling terminal
//!   ([`spawn_child`], [`UnixPtyChild`])

mod child;
mod pty;

pub use child::{UnixPtyChild, spawn_child};
pub use pty::{PtyPair, PtyReader, PtyWriter, UnixPtyMaster};
