//! Implementation of the `latch acquire` command.

use crate::config::Config;
use crate::error::Result;
use crate::exit_codes;
use crate::lock;
use crate::process::OsProcessMonitor;

/// Execute the `latch acquire` command.
///
/// Reserves the browser for the calling process: recovers stale/expired
/// records, starts or adopts the browser, and writes the lock record.
pub fn cmd_acquire() -> Result<i32> {
    let config = Config::from_env()?;
    let record = lock::acquire(&config, &OsProcessMonitor)?;

    println!("Acquired browser lock.");
    println!();
    println!("  Owner:     {}", record.owner);
    println!("  Holder:    pid {}", record.holder_pid);
    match record.resource_pid {
        Some(pid) => println!("  Browser:   pid {} on port {}", pid, config.cdp_port),
        None => println!(
            "  Browser:   adopted on port {} (pid unknown)",
            config.cdp_port
        ),
    }
    println!(
        "  Expires:   in {}s unless released first",
        config.lock_timeout_secs
    );

    Ok(exit_codes::SUCCESS)
}
