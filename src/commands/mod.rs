//! Command implementations for latch.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Commands format user-facing output; all semantics live
//! in the `lock`, `browser`, and `runner` modules.

mod acquire;
mod release;
mod run;
mod status;

use crate::cli::Command;
use crate::error::Result;

/// Dispatch a command to its implementation.
///
/// Returns the process exit code to report: commands like `run` propagate
/// the consumer's own exit code rather than a fixed success/failure pair.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Acquire => acquire::cmd_acquire(),
        Command::Release => release::cmd_release(),
        Command::Status => status::cmd_status(),
        Command::Run(args) => run::cmd_run(args),
    }
}
