//! tabtest: tab-completion test harness
//!
//! Drives an interactive `bash` through a pseudo-terminal, types partial
//! commands, triggers completion and checks the suggestions the shell
//! prints against expectations from a TOML suite. All cases share one
//! shell, so state set up by the sourced completion script carries over
//! from case to case.
//!
//! # Example
//!
//! ```ignore
//! use tabtest::{Reporter, Suite, run_suite};
//!
//! #[tokio::main]
//! async fn main() -> tabtest::Result<()> {
//!     let suite = Suite::load("config.toml")?;
//!     let result = run_suite(&suite, Reporter::stdout()).await?;
//!     assert!(result.success());
//!     Ok(())
//! }
//! ```
//!
//! Synchronization with the shell is by fixed delays only. A host that is
//! too slow for the configured `delay` produces mismatches, not errors.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod logging;
pub mod normalize;
pub mod session;
pub mod sink;
pub mod types;

#[cfg(unix)]
pub mod runner;

pub use config::{SessionConfig, Suite, TestCase};
pub use error::{HarnessError, Result};
pub use evaluator::{CaseOutcome, CompletionProbe, Evaluator, Reporter, RunResult};
pub use logging::init_logging;
pub use normalize::{canonicalize, normalize_output};
#[cfg(unix)]
pub use runner::run_suite;
pub use session::Session;
#[cfg(unix)]
pub use session::PtySession;
pub use sink::{DrainHandle, OutputSink};
pub use types::{ControlChar, DriverState};
