//! Implementation of the `latch status` command.

use crate::config::Config;
use crate::error::Result;
use crate::exit_codes;
use crate::lock::{self, LockState};
use crate::process::OsProcessMonitor;

/// Execute the `latch status` command.
///
/// Read-only report of the lock record and the browser endpoint. Staleness
/// and expiry are called out explicitly; nothing is recovered here.
pub fn cmd_status() -> Result<i32> {
    let config = Config::from_env()?;
    let status = lock::status(&config, &OsProcessMonitor);

    println!("Browser Lock Status");
    println!("===================");
    println!();

    match &status.record {
        Some(record) => {
            println!(
                "  Lock:      held by {} (pid {}, acquired {} ago)",
                record.owner,
                record.holder_pid,
                record.age_string()
            );
            println!(
                "  Phase:     {}",
                match record.state {
                    LockState::Reserved => "reserved (browser pid not yet recorded)",
                    LockState::Bound => "bound",
                }
            );
            match record.resource_pid {
                Some(pid) => println!("  Resource:  pid {}", pid),
                None => println!("  Resource:  pid unknown"),
            }
        }
        None if status.locked => {
            println!("  Lock:      held (record unreadable)");
        }
        None => {
            println!("  Lock:      not held");
        }
    }

    match (status.resource_healthy, &status.browser_version) {
        (true, Some(version)) => {
            println!(
                "  Browser:   healthy on port {} ({})",
                config.cdp_port, version
            );
        }
        (true, None) => println!("  Browser:   healthy on port {}", config.cdp_port),
        (false, _) => println!("  Browser:   not responding on port {}", config.cdp_port),
    }

    if status.stale {
        println!();
        println!("  Note: holder and browser are both gone; the next acquire will");
        println!("  recover this lock automatically.");
    }
    if status.expired {
        println!();
        println!(
            "  Note: lock exceeded the {}s timeout; the next acquire will",
            config.lock_timeout_secs
        );
        println!("  force-release it even if its processes are still alive.");
    }

    Ok(exit_codes::SUCCESS)
}
