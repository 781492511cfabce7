//! Suite configuration.
//!
//! A suite is loaded once from a TOML document, validated, and turned into
//! an immutable [`Suite`]: the [`SessionConfig`] that drives the shell plus
//! the ordered [`TestCase`] list with canonicalized expectations.
//!
//! ```toml
//! path = "complete.sh"
//! stop_after_first_fail = true
//! delay = 100
//!
//! [[tests]]
//! name = "basic"
//! command = "ls --h"
//! expected_output = "--help --human-readable"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigSource, HarnessError, Result};
use crate::normalize::canonicalize;

/// Delay between driver steps when the config leaves it unset or zero.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// Time the shell gets to start before the bootstrap lines are sent.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(1);

/// Shell launched when the config does not name one.
pub const DEFAULT_SHELL: &str = "bash";

/// Prompt the bootstrap installs; lines starting with it are echoes, not suggestions.
pub const DEFAULT_PROMPT_MARKER: char = '#';

/// One completion check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    /// Human-readable name, used in reports.
    pub name: String,
    /// Partial command line typed before completion is triggered.
    pub command: String,
    /// Expected suggestions. Canonical (sorted, single-spaced) once loaded
    /// through [`Suite`].
    pub expected_output: String,
}

impl TestCase {
    /// Create a test case, canonicalizing the expectation.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        expected_output: impl AsRef<str>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            expected_output: canonicalize(expected_output.as_ref()),
        }
    }
}

/// The on-disk document, before defaults and validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Test cases, in execution order.
    #[serde(default)]
    pub tests: Vec<TestCase>,
    /// Script sourced into the shell before testing.
    pub path: String,
    /// Stop at the first failing case.
    #[serde(default)]
    pub stop_after_first_fail: bool,
    /// Delay between driver steps, in milliseconds. Zero means default.
    #[serde(default)]
    pub delay: u64,
    /// Delay before the bootstrap lines, in milliseconds. Zero means default.
    #[serde(default)]
    pub startup_delay: u64,
    /// Shell executable.
    #[serde(default)]
    pub shell: Option<String>,
    /// Extra arguments for the shell.
    #[serde(default)]
    pub shell_args: Vec<String>,
    /// Prompt installed by the bootstrap, a single character.
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Immutable configuration of one run's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Script sourced into the shell during bootstrap.
    pub source_path: String,
    /// Stop the run at the first failing case.
    pub stop_after_first_fail: bool,
    /// Fixed wait between driver steps.
    pub inter_step_delay: Duration,
    /// Fixed wait between spawning the shell and bootstrapping it.
    pub startup_delay: Duration,
    /// Shell executable.
    pub shell: String,
    /// Extra shell arguments.
    pub shell_args: Vec<String>,
    /// Prompt character installed by the bootstrap.
    pub prompt_marker: char,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            stop_after_first_fail: false,
            inter_step_delay: DEFAULT_DELAY,
            startup_delay: DEFAULT_STARTUP_DELAY,
            shell: DEFAULT_SHELL.to_string(),
            shell_args: Vec::new(),
            prompt_marker: DEFAULT_PROMPT_MARKER,
        }
    }
}

impl SessionConfig {
    /// Create a config that sources `source_path`, with defaults elsewhere.
    #[must_use]
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    /// Set the inter-step delay. Zero selects [`DEFAULT_DELAY`].
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.inter_step_delay = or_default(delay, DEFAULT_DELAY);
        self
    }

    /// Set the startup delay. Zero selects [`DEFAULT_STARTUP_DELAY`].
    #[must_use]
    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = or_default(delay, DEFAULT_STARTUP_DELAY);
        self
    }

    /// Set the stop-after-first-fail policy.
    #[must_use]
    pub const fn stop_after_first_fail(mut self, stop: bool) -> Self {
        self.stop_after_first_fail = stop;
        self
    }

    /// Set the shell executable and its arguments.
    #[must_use]
    pub fn shell<I, S>(mut self, shell: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shell = shell.into();
        self.shell_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the prompt marker.
    #[must_use]
    pub const fn prompt_marker(mut self, marker: char) -> Self {
        self.prompt_marker = marker;
        self
    }
}

fn or_default(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

/// A loaded, validated suite.
#[derive(Debug, Clone)]
pub struct Suite {
    /// Session settings for the run.
    pub session: SessionConfig,
    /// Cases in execution order, expectations canonicalized.
    pub cases: Vec<TestCase>,
}

impl Suite {
    /// Read and parse a suite from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::ConfigLoad {
            path: path.to_path_buf(),
            source: ConfigSource::Read(e),
        })?;

        let file: ConfigFile = toml::from_str(&content).map_err(|e| HarnessError::ConfigLoad {
            path: path.to_path_buf(),
            source: ConfigSource::Parse(e),
        })?;

        let suite = Self::from_file(file)?;
        tracing::info!(
            config = %path.display(),
            cases = suite.cases.len(),
            delay_ms = suite.session.inter_step_delay.as_millis() as u64,
            "loaded suite"
        );
        Ok(suite)
    }

    /// Parse a suite from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| HarnessError::ConfigLoad {
            path: "<inline>".into(),
            source: ConfigSource::Parse(e),
        })?;
        Self::from_file(file)
    }

    /// Apply defaults, validate and canonicalize a parsed document.
    pub fn from_file(file: ConfigFile) -> Result<Self> {
        let prompt_marker = match file.prompt.as_deref() {
            None => DEFAULT_PROMPT_MARKER,
            Some(prompt) => {
                let mut chars = prompt.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_whitespace() => c,
                    _ => {
                        return Err(HarnessError::invalid_config(format!(
                            "prompt must be a single non-space character, got {prompt:?}"
                        )));
                    }
                }
            }
        };

        let shell = match file.shell {
            Some(shell) if shell.trim().is_empty() => {
                return Err(HarnessError::invalid_config("shell must not be empty"));
            }
            Some(shell) => shell,
            None => DEFAULT_SHELL.to_string(),
        };

        let mut cases = Vec::with_capacity(file.tests.len());
        for (index, case) in file.tests.into_iter().enumerate() {
            if case.command.contains(['\n', '\r']) {
                return Err(HarnessError::invalid_config(format!(
                    "test {index} ({}) has a line break in its command",
                    case.name
                )));
            }
            cases.push(TestCase::new(case.name, case.command, case.expected_output));
        }
        if cases.is_empty() {
            tracing::warn!("suite has no tests");
        }

        let session = SessionConfig::new(file.path)
            .stop_after_first_fail(file.stop_after_first_fail)
            .delay(Duration::from_millis(file.delay))
            .startup_delay(Duration::from_millis(file.startup_delay))
            .shell(shell, file.shell_args)
            .prompt_marker(prompt_marker);

        Ok(Self { session, cases })
    }
}
