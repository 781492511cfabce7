//! Integration tests against a real `bash` on a pty.
//!
//! Tests skip when `bash` is not installed. The completion scenarios are
//! `#[ignore]`d: they depend on the host being fast enough for the
//! configured delays. Run them with `cargo test -- --ignored`.

#![cfg(unix)]

use std::io::Write;
use std::time::Duration;

use tabtest::{
    DriverState, HarnessError, PtySession, Reporter, SessionConfig, Suite, TestCase, run_suite,
};
use tabtest_pty::ExitStatus;
use tempfile::TempDir;

const COMPLETION_SCRIPT: &str = r#"
bind 'set enable-bracketed-paste off' 2>/dev/null
bind 'set bell-style none' 2>/dev/null
_tabtest_demo() {
    COMPREPLY=( $(compgen -W "--help --human-readable --version" -- "${COMP_WORDS[COMP_CWORD]}") )
}
complete -F _tabtest_demo demo
"#;

fn bash_available() -> bool {
    std::process::Command::new("bash")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

macro_rules! require_bash {
    () => {
        if !bash_available() {
            eprintln!("bash not available, skipping");
            return;
        }
    };
}

/// A directory holding the completion script.
fn script_dir() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("complete.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(COMPLETION_SCRIPT.as_bytes()).unwrap();
    (dir, path.display().to_string())
}

fn session_config(script: &str) -> SessionConfig {
    SessionConfig::new(script)
        .shell("bash", ["--norc", "--noprofile"])
        .startup_delay(Duration::from_millis(300))
        .delay(Duration::from_millis(300))
}

#[tokio::test]
async fn bootstrap_and_clean_exit() {
    require_bash!();
    let (_dir, script) = script_dir();

    let mut session = PtySession::spawn(session_config(&script)).unwrap();
    assert!(session.pid() > 0);
    session.bootstrap().await.unwrap();
    assert_eq!(session.state(), DriverState::Idle);

    let status = session.terminate().await.unwrap();
    assert_eq!(status, ExitStatus::Exited(0));
}

#[tokio::test]
async fn nonzero_exit_is_abnormal() {
    require_bash!();
    let (_dir, script) = script_dir();

    let mut session = PtySession::spawn(session_config(&script)).unwrap();
    session.bootstrap().await.unwrap();
    session.send_line("false").await.unwrap();
    session.settle().await;

    // `exit` without an argument reports the status of the last command.
    let err = session.terminate().await.unwrap_err();
    assert!(matches!(
        err,
        HarnessError::AbnormalExit {
            status: ExitStatus::Exited(1)
        }
    ));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn missing_script_still_runs() {
    require_bash!();
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("absent.sh").display().to_string();

    let mut session = PtySession::spawn(session_config(&script)).unwrap();
    session.bootstrap().await.unwrap();
    // A failed `source` is the last command, so the exit is abnormal.
    assert!(session.terminate().await.is_err());
}

#[tokio::test]
#[ignore = "timing depends on the host"]
async fn matching_completion() {
    require_bash!();
    let (_dir, script) = script_dir();
    let suite = Suite {
        session: session_config(&script),
        cases: vec![TestCase::new("flags", "demo --h", "--human-readable --help")],
    };

    let mut out = Vec::new();
    let result = run_suite(&suite, Reporter::new(&mut out)).await.unwrap();
    assert!(result.success(), "{}", String::from_utf8_lossy(&out));
    assert_eq!(String::from_utf8(out).unwrap(), "Test 0 - flags - ok\n");
}

#[tokio::test]
#[ignore = "timing depends on the host"]
async fn missing_suggestion_is_reported() {
    require_bash!();
    let (_dir, script) = script_dir();
    let suite = Suite {
        session: session_config(&script),
        cases: vec![TestCase::new("flags", "demo --h", "--help")],
    };

    let mut out = Vec::new();
    let result = run_suite(&suite, Reporter::new(&mut out)).await.unwrap();
    assert_eq!(result.failed, 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Test 0 - flags - failed\n\
         We want \"--help\" but have \"--help --human-readable\"\n\
         We have some failed tests\n"
    );
}

#[tokio::test]
#[ignore = "timing depends on the host"]
async fn cases_share_one_shell() {
    require_bash!();
    let (_dir, script) = script_dir();
    let suite = Suite {
        session: session_config(&script).stop_after_first_fail(true),
        cases: vec![
            TestCase::new("first", "demo --h", "--help --human-readable"),
            TestCase::new("second", "demo --", "--help --human-readable --version"),
            TestCase::new("third", "demo --h", "--help --human-readable"),
        ],
    };

    let mut out = Vec::new();
    let result = run_suite(&suite, Reporter::new(&mut out)).await.unwrap();
    assert!(result.success(), "{}", String::from_utf8_lossy(&out));
    assert_eq!(result.passed, 3);
}

#[tokio::test]
async fn unknown_shell_is_a_setup_error() {
    let suite = Suite {
        session: SessionConfig::new("c.sh").shell("/nonexistent/shell", Vec::<String>::new()),
        cases: Vec::new(),
    };
    let err = run_suite(&suite, Reporter::new(Vec::new())).await.unwrap_err();
    assert!(err.is_setup());
}
