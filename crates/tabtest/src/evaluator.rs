//! Test evaluation and console reporting.
//!
//! The [`Evaluator`] walks the cases of a suite in order against one shared
//! [`CompletionProbe`], compares the normalized capture with each case's
//! expectation and reports every outcome as it happens.

use std::future::Future;
use std::io::Write;

use tabtest_pty::ExitStatus;
use tracing::{info, warn};

use crate::config::{SessionConfig, TestCase};
use crate::error::{HarnessError, Result};
use crate::normalize::normalize_output;

/// Something that can capture the completion output of a typed command.
///
/// Implemented by [`crate::session::Session`]; tests drive the evaluator
/// with scripted probes.
pub trait CompletionProbe: Send + Sized {
    /// Type `command`, trigger completion and return the raw output.
    fn capture_completion(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Shut the probe down after the last case.
    fn terminate(self) -> impl Future<Output = Result<ExitStatus>> + Send;
}

/// Outcome of a single case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// The normalized capture equals the expectation.
    Passed,
    /// The normalized capture differs from the expectation.
    Mismatch {
        /// Canonical expected output.
        expected: String,
        /// Normalized captured output.
        actual: String,
    },
}

impl CaseOutcome {
    /// Compare a canonical expectation with a normalized capture.
    #[must_use]
    pub fn compare(expected: &str, actual: String) -> Self {
        if expected == actual {
            Self::Passed
        } else {
            Self::Mismatch {
                expected: expected.to_string(),
                actual,
            }
        }
    }

    /// Check if the case passed.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Tally of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Cases whose capture matched.
    pub passed: usize,
    /// Cases whose capture did not match.
    pub failed: usize,
    /// The run ended at the first failure.
    pub stopped_early: bool,
}

impl RunResult {
    /// Check if every case that ran passed and the run was not cut short.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failed == 0 && !self.stopped_early
    }

    /// Number of cases that ran.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed
    }
}

/// Writes per-case results for a human reader.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
}

impl Reporter<std::io::Stdout> {
    /// Report to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    /// Report to `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Record a passing case.
    pub fn case_passed(&mut self, index: usize, case: &TestCase) -> std::io::Result<()> {
        writeln!(self.out, "Test {index} - {} - ok", case.name)
    }

    /// Record a failing case with both sides of the comparison.
    pub fn case_failed(
        &mut self,
        index: usize,
        case: &TestCase,
        expected: &str,
        actual: &str,
    ) -> std::io::Result<()> {
        writeln!(self.out, "Test {index} - {} - failed", case.name)?;
        writeln!(self.out, "We want \"{expected}\" but have \"{actual}\"")
    }

    /// Close the report. Prints nothing when everything passed.
    pub fn summary(&mut self, result: &RunResult) -> std::io::Result<()> {
        if result.failed > 0 {
            writeln!(self.out, "We have some failed tests")?;
        }
        self.out.flush()
    }
}

/// Runs the cases of a suite in order against one probe.
#[derive(Debug)]
pub struct Evaluator<'a, W> {
    config: &'a SessionConfig,
    cases: &'a [TestCase],
    reporter: Reporter<W>,
}

impl<'a, W: Write> Evaluator<'a, W> {
    /// Create an evaluator for `cases`.
    pub const fn new(
        config: &'a SessionConfig,
        cases: &'a [TestCase],
        reporter: Reporter<W>,
    ) -> Self {
        Self {
            config,
            cases,
            reporter,
        }
    }

    fn report<T>(result: std::io::Result<T>) -> Result<T> {
        result.map_err(|e| HarnessError::io("writing report", e))
    }

    /// Evaluate every case and shut the probe down.
    ///
    /// With `stop_after_first_fail`, the first mismatch ends the run: later
    /// cases are not attempted and the probe is dropped without a graceful
    /// shutdown.
    ///
    /// # Errors
    ///
    /// Errors from the probe (transport failures, abnormal shell exit) and
    /// failures writing the report. Mismatches are not errors.
    pub async fn run<P: CompletionProbe>(mut self, mut probe: P) -> Result<RunResult> {
        let mut result = RunResult::default();

        for (index, case) in self.cases.iter().enumerate() {
            let raw = probe.capture_completion(&case.command).await?;
            let actual = normalize_output(&raw, self.config.prompt_marker);

            match CaseOutcome::compare(&case.expected_output, actual) {
                CaseOutcome::Passed => {
                    info!(index, name = %case.name, "case passed");
                    result.passed += 1;
                    Self::report(self.reporter.case_passed(index, case))?;
                }
                CaseOutcome::Mismatch { expected, actual } => {
                    warn!(index, name = %case.name, %expected, %actual, "case failed");
                    result.failed += 1;
                    Self::report(self.reporter.case_failed(index, case, &expected, &actual))?;

                    if self.config.stop_after_first_fail {
                        let remaining = self.cases.len() - index - 1;
                        info!(remaining, "stopping after first failure");
                        result.stopped_early = true;
                        drop(probe);
                        Self::report(self.reporter.summary(&result))?;
                        return Ok(result);
                    }
                }
            }
        }

        // The summary is printed even when teardown fails.
        let teardown = probe.terminate().await;
        Self::report(self.reporter.summary(&result))?;
        teardown?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Default)]
    struct ProbeLog {
        commands: Vec<String>,
        terminated: bool,
        dropped: bool,
    }

    /// Replays canned outputs, one per case.
    struct ScriptedProbe {
        outputs: VecDeque<Vec<u8>>,
        exit: ExitStatus,
        log: Arc<Mutex<ProbeLog>>,
    }

    impl ScriptedProbe {
        fn new(outputs: &[&str]) -> (Self, Arc<Mutex<ProbeLog>>) {
            let log = Arc::new(Mutex::new(ProbeLog::default()));
            let probe = Self {
                outputs: outputs.iter().map(|o| o.as_bytes().to_vec()).collect(),
                exit: ExitStatus::Exited(0),
                log: Arc::clone(&log),
            };
            (probe, log)
        }
    }

    impl CompletionProbe for ScriptedProbe {
        async fn capture_completion(&mut self, command: &str) -> Result<Vec<u8>> {
            self.log.lock().unwrap().commands.push(command.to_string());
            Ok(self.outputs.pop_front().unwrap_or_default())
        }

        async fn terminate(self) -> Result<ExitStatus> {
            self.log.lock().unwrap().terminated = true;
            if self.exit.success() {
                Ok(self.exit)
            } else {
                Err(HarnessError::AbnormalExit { status: self.exit })
            }
        }
    }

    impl Drop for ScriptedProbe {
        fn drop(&mut self) {
            if let Ok(mut log) = self.log.lock() {
                log.dropped = true;
            }
        }
    }

    fn case(name: &str, command: &str, expected: &str) -> TestCase {
        TestCase::new(name, command, expected)
    }

    async fn evaluate(
        config: &SessionConfig,
        cases: &[TestCase],
        probe: ScriptedProbe,
    ) -> (Result<RunResult>, String) {
        let mut out = Vec::new();
        let result = Evaluator::new(config, cases, Reporter::new(&mut out))
            .run(probe)
            .await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn matching_completion_passes() {
        let config = SessionConfig::new("complete.sh");
        let cases = [case("basic", "ls --h", "--human-readable --help")];
        let (probe, log) = ScriptedProbe::new(&["\x07\r\n--help  --human-readable\r\n#ls --h"]);

        let (result, out) = evaluate(&config, &cases, probe).await;
        let result = result.unwrap();
        assert!(result.success());
        assert_eq!(result.passed, 1);
        assert_eq!(out, "Test 0 - basic - ok\n");
        assert!(log.lock().unwrap().terminated);
    }

    #[tokio::test]
    async fn missing_suggestion_fails() {
        let config = SessionConfig::new("complete.sh");
        let cases = [case("basic", "ls --h", "--help")];
        let (probe, log) = ScriptedProbe::new(&["--help  --human-readable\r\n#ls --h"]);

        let (result, out) = evaluate(&config, &cases, probe).await;
        let result = result.unwrap();
        assert!(!result.success());
        assert_eq!(result.failed, 1);
        assert_eq!(
            out,
            "Test 0 - basic - failed\n\
             We want \"--help\" but have \"--help --human-readable\"\n\
             We have some failed tests\n"
        );
        assert!(log.lock().unwrap().terminated);
    }

    #[tokio::test]
    async fn stop_after_first_fail_skips_remaining_cases() {
        let config = SessionConfig::new("complete.sh").stop_after_first_fail(true);
        let cases = [
            case("one", "a", "alpha"),
            case("two", "b", "beta"),
            case("three", "c", "gamma"),
            case("four", "d", "delta"),
        ];
        let (probe, log) = ScriptedProbe::new(&["alpha", "wrong", "gamma", "delta"]);

        let (result, out) = evaluate(&config, &cases, probe).await;
        let result = result.unwrap();
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(result.stopped_early);
        assert!(!result.success());

        let log = log.lock().unwrap();
        assert_eq!(log.commands, ["a", "b"]);
        assert!(!log.terminated);
        assert!(log.dropped);
        assert!(out.contains("Test 1 - two - failed"));
        assert!(!out.contains("Test 2"));
    }

    #[tokio::test]
    async fn failures_do_not_stop_by_default() {
        let config = SessionConfig::new("complete.sh");
        let cases = [
            case("one", "a", "alpha"),
            case("two", "b", "beta"),
            case("three", "c", "gamma"),
        ];
        let (probe, log) = ScriptedProbe::new(&["nope", "beta", "nah"]);

        let (result, out) = evaluate(&config, &cases, probe).await;
        let result = result.unwrap();
        assert_eq!(
            result,
            RunResult {
                passed: 1,
                failed: 2,
                stopped_early: false
            }
        );
        assert_eq!(log.lock().unwrap().commands.len(), 3);
        assert!(out.contains("Test 1 - two - ok"));
        assert!(out.ends_with("We have some failed tests\n"));
    }

    #[tokio::test]
    async fn abnormal_teardown_propagates() {
        let config = SessionConfig::new("complete.sh");
        let cases = [case("one", "a", "alpha")];
        let (mut probe, _log) = ScriptedProbe::new(&["alpha"]);
        probe.exit = ExitStatus::Exited(1);

        let (result, _) = evaluate(&config, &cases, probe).await;
        assert!(matches!(result, Err(HarnessError::AbnormalExit { .. })));
    }

    #[tokio::test]
    async fn summary_precedes_teardown_error() {
        let config = SessionConfig::new("complete.sh");
        let cases = [case("one", "a", "beta")];
        let (mut probe, log) = ScriptedProbe::new(&["alpha"]);
        probe.exit = ExitStatus::Exited(1);

        let (result, out) = evaluate(&config, &cases, probe).await;
        assert!(matches!(result, Err(HarnessError::AbnormalExit { .. })));
        assert_eq!(
            out,
            "Test 0 - one - failed\n\
             We want \"beta\" but have \"alpha\"\n\
             We have some failed tests\n"
        );
        assert!(log.lock().unwrap().terminated);
    }

    #[tokio::test]
    async fn custom_prompt_marker_is_filtered() {
        let config = SessionConfig::new("complete.sh").prompt_marker('%');
        let cases = [case("git", "git ch", "checkout cherry-pick")];
        let (probe, _log) = ScriptedProbe::new(&["\r\ncherry-pick  checkout\r\n%git ch"]);

        let (result, _) = evaluate(&config, &cases, probe).await;
        assert!(result.unwrap().success());
    }

    #[test]
    fn outcome_comparison() {
        assert!(CaseOutcome::compare("a b", "a b".to_string()).is_passed());
        assert_eq!(
            CaseOutcome::compare("a", "a b".to_string()),
            CaseOutcome::Mismatch {
                expected: "a".to_string(),
                actual: "a b".to_string()
            }
        );
    }

    #[test]
    fn empty_run_succeeds() {
        let result = RunResult::default();
        assert!(result.success());
        assert_eq!(result.total(), 0);
    }
}
