//! Implementation of the `latch release` command.

use crate::config::Config;
use crate::error::Result;
use crate::exit_codes;
use crate::lock;
use crate::process::OsProcessMonitor;

/// Execute the `latch release` command.
///
/// The all-exit-paths cleanup primitive: stops the browser (tracked pid and
/// port sweep) and removes the lock record. Never fails, even when nothing
/// was held.
pub fn cmd_release() -> Result<i32> {
    let config = Config::from_env()?;
    lock::release(&config, &OsProcessMonitor);

    println!("Released browser lock and stopped the browser.");

    Ok(exit_codes::SUCCESS)
}
