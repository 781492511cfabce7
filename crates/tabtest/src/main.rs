//! `tabtest` command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tabtest::error::EXIT_FAILURE;
use tabtest::{Reporter, Suite, init_logging, run_suite};

/// Check a bash completion script by typing into a real shell.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    /// Path to the suite configuration.
    #[clap(short = 'c', long = "config", default_value = "config.toml", env = "TABTEST_CONFIG")]
    config: PathBuf,

    /// Increase diagnostic output on stderr (repeatable).
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose) {
        eprintln!("tabtest: failed to initialize logging: {e}");
    }

    let outcome = match Suite::load(&args.config) {
        Ok(suite) => run_suite(&suite, Reporter::stdout()).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(result) if result.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_FAILURE),
        Err(e) => {
            eprintln!("tabtest: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn verbosity_counts() {
        let args = Args::try_parse_from(["tabtest", "-vv", "--config", "suite.toml"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.config, PathBuf::from("suite.toml"));
    }
}
