//! CLI argument parsing for latch.
//!
//! Uses clap derive macros for declarative argument definitions. This module
//! defines the command structure; actual implementations are in the
//! `commands` module.

use clap::{Parser, Subcommand};

/// Latch: single-host lock manager for a shared remote-debugging browser.
///
/// One browser, one debugging port, at most one consumer at a time. Latch
/// persists a single lock record on disk, recovers it when its holder dies
/// or overstays, and supervises consumer runs with a timeout watchdog.
#[derive(Parser, Debug)]
#[command(name = "latch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for latch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reserve the shared browser, starting it if needed.
    ///
    /// Fails if a live, unexpired lock belongs to another process. Stale and
    /// expired locks are recovered automatically first.
    Acquire,

    /// Stop the shared browser and remove the lock record.
    ///
    /// Idempotent: succeeds even when nothing is locked or running.
    Release,

    /// Report lock and browser state.
    ///
    /// Read-only: reports staleness and expiry without recovering either.
    Status,

    /// Run a consumer command under the lock with a timeout watchdog.
    ///
    /// Acquires, spawns the command, hands it the lock, and races it against
    /// the deadline. The lock is released however the run ends.
    Run(RunArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Program to execute while the lock is held.
    pub command: String,

    /// Maximum run duration in seconds before the watchdog kills the consumer.
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Arguments passed through to the consumer program.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_timeout_and_trailing_args() {
        let cli = Cli::try_parse_from([
            "latch", "run", "--timeout", "30", "node", "capture.js", "--url", "example.com",
        ])
        .unwrap();

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.command, "node");
                assert_eq!(args.timeout, 30);
                assert_eq!(args.args, vec!["capture.js", "--url", "example.com"]);
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn run_timeout_defaults_to_five_minutes() {
        let cli = Cli::try_parse_from(["latch", "run", "node"]).unwrap();
        match cli.command {
            Command::Run(args) => assert_eq!(args.timeout, 300),
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["latch", "run"]).is_err());
    }
}
