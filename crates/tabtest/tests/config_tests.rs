//! Integration tests for loading suites from disk.

use std::io::Write;
use std::time::Duration;

use tabtest::config::DEFAULT_DELAY;
use tabtest::error::{ConfigSource, EXIT_SETUP};
use tabtest::{HarnessError, Suite};
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn load_full_suite() {
    let file = write_config(
        r#"
        path = "./complete.sh"
        stop_after_first_fail = true
        delay = 50
        startup_delay = 250

        [[tests]]
        name = "flags"
        command = "ls --h"
        expected_output = "--human-readable --help"

        [[tests]]
        name = "subcommands"
        command = "git ch"
        expected_output = """
        checkout
        cherry-pick
        cherry
        """
        "#,
    );

    let suite = Suite::load(file.path()).unwrap();
    assert_eq!(suite.session.source_path, "./complete.sh");
    assert!(suite.session.stop_after_first_fail);
    assert_eq!(suite.session.inter_step_delay, Duration::from_millis(50));
    assert_eq!(suite.session.startup_delay, Duration::from_millis(250));

    let names: Vec<_> = suite.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["flags", "subcommands"]);
    assert_eq!(suite.cases[0].expected_output, "--help --human-readable");
    assert_eq!(suite.cases[1].expected_output, "checkout cherry cherry-pick");
}

#[test]
fn case_order_is_preserved() {
    let mut doc = String::from("path = \"c.sh\"\n");
    for i in 0..10 {
        doc.push_str(&format!(
            "[[tests]]\nname = \"case-{i}\"\ncommand = \"cmd{i} \"\nexpected_output = \"\"\n"
        ));
    }
    let file = write_config(&doc);

    let suite = Suite::load(file.path()).unwrap();
    for (i, case) in suite.cases.iter().enumerate() {
        assert_eq!(case.name, format!("case-{i}"));
    }
}

#[test]
fn minimal_suite_gets_defaults() {
    let file = write_config("path = \"c.sh\"\n");
    let suite = Suite::load(file.path()).unwrap();
    assert_eq!(suite.session.inter_step_delay, DEFAULT_DELAY);
    assert!(!suite.session.stop_after_first_fail);
    assert!(suite.cases.is_empty());
}

#[test]
fn malformed_toml() {
    let file = write_config("path = \n[[tests]");
    let err = Suite::load(file.path()).unwrap_err();

    match &err {
        HarnessError::ConfigLoad { path, source } => {
            assert_eq!(path, file.path());
            assert!(matches!(source, ConfigSource::Parse(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), EXIT_SETUP);
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn wrong_field_type() {
    let file = write_config("path = \"c.sh\"\ndelay = \"fast\"\n");
    let err = Suite::load(file.path()).unwrap_err();
    assert!(err.is_setup());
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Suite::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::ConfigLoad {
            source: ConfigSource::Read(_),
            ..
        }
    ));
}
