//! Implementation of the `latch run` command.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::process::OsProcessMonitor;
use crate::runner::{self, RunOutcome};

/// Execute the `latch run` command.
///
/// Runs a consumer under the lock and propagates its exit code, or the
/// timeout code when the watchdog had to kill it. Each outcome prints a
/// distinct classification so callers can tell them apart at a glance too.
pub fn cmd_run(args: RunArgs) -> Result<i32> {
    let config = Config::from_env()?;

    println!(
        "Running '{}' under the browser lock (timeout: {}s)...",
        args.command, args.timeout
    );

    let outcome = runner::run(
        &config,
        &OsProcessMonitor,
        &args.command,
        &args.args,
        args.timeout,
    )?;

    match outcome {
        RunOutcome::Completed(0) => println!("Consumer completed successfully."),
        RunOutcome::Completed(code) => {
            eprintln!("Consumer failed with exit code {}.", code);
        }
        RunOutcome::TimedOut => {
            eprintln!(
                "Consumer timed out after {}s and was terminated.",
                args.timeout
            );
        }
    }

    Ok(outcome.exit_code())
}
