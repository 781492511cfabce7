//! Suite runner: one shell, all cases.

use std::io::Write;

use tracing::info;

use crate::config::Suite;
use crate::error::Result;
use crate::evaluator::{Evaluator, Reporter, RunResult};
use crate::session::PtySession;

/// Spawn the configured shell, bootstrap it and evaluate every case.
///
/// The shell is released on every path: terminated gracefully after the
/// last case, killed when the run stops early or fails.
///
/// # Errors
///
/// Setup failures (pty, spawn), transport failures during the run and an
/// abnormal shell exit at teardown.
pub async fn run_suite<W: Write>(suite: &Suite, reporter: Reporter<W>) -> Result<RunResult> {
    let mut session = PtySession::spawn(suite.session.clone())?;
    session.bootstrap().await?;

    info!(cases = suite.cases.len(), "running suite");
    let evaluator = Evaluator::new(&suite.session, &suite.cases, reporter);
    let result = evaluator.run(session).await?;
    info!(
        passed = result.passed,
        failed = result.failed,
        stopped_early = result.stopped_early,
        "suite finished"
    );
    Ok(result)
}
