//! Acquire, release, status, and recovery operations on the lock record.

use super::record::{LockRecord, LockState};
use crate::browser;
use crate::config::Config;
use crate::error::{LatchError, Result};
use crate::events::{Event, EventAction, append_event_best_effort};
use crate::fs::atomic_write;
use crate::process::ProcessMonitor;
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// How an existing lock record relates to the host right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classification {
    /// Someone holds it: at least one recorded pid is alive and the record
    /// is younger than the expiry.
    LiveUnexpired,
    /// Neither recorded pid names a running process.
    Stale,
    /// Older than the expiry, liveness notwithstanding.
    Expired,
}

/// Classify a record against the liveness probe and the expiry budget.
///
/// Expiry wins over liveness: a hung consumer that never signals completion
/// still reports alive, and expiry is the only way to get the lock back.
pub(crate) fn classify(
    record: &LockRecord,
    monitor: &dyn ProcessMonitor,
    timeout_secs: u64,
) -> Classification {
    if record.is_expired(timeout_secs) {
        return Classification::Expired;
    }

    // Holder and resource are probed independently: the lock stays live
    // while the browser is running even if the original holder shell exited.
    let holder_alive = monitor.is_alive(record.holder_pid);
    let resource_alive = record
        .resource_pid
        .is_some_and(|pid| monitor.is_alive(pid));

    if holder_alive || resource_alive {
        Classification::LiveUnexpired
    } else {
        Classification::Stale
    }
}

/// Acquire the browser lock.
///
/// Recovers stale and expired records, creates the new record with exclusive
/// semantics, starts (or adopts) the browser, and refines the record with the
/// browser's pid. Fails with `LockHeld` when a live, unexpired record belongs
/// to someone else, and with `LaunchFailed` when the browser never comes up
/// (in which case the provisional record is removed again).
pub fn acquire(config: &Config, monitor: &dyn ProcessMonitor) -> Result<LockRecord> {
    let mut record = reserve(config, monitor)?;

    match browser::ensure_running(config, monitor) {
        Ok(pid) => {
            record.resource_pid = (pid > 0).then_some(pid);
            record.state = LockState::Bound;
            atomic_write(config.lock_path(), record.to_json()?.as_bytes())?;

            append_event_best_effort(
                config,
                &Event::new(EventAction::Acquired).with_details(json!({
                    "holder_pid": record.holder_pid,
                    "resource_pid": record.resource_pid,
                    "port": config.cdp_port,
                })),
            );

            Ok(record)
        }
        Err(e) => {
            // Leave the system unlocked rather than reserved-but-browserless.
            let _ = fs::remove_file(config.lock_path());
            Err(e)
        }
    }
}

/// Recovery sweep plus exclusive creation of a provisional `Reserved` record.
///
/// Split out of `acquire` so the classification and race behavior can be
/// exercised without launching a browser.
pub(crate) fn reserve(config: &Config, monitor: &dyn ProcessMonitor) -> Result<LockRecord> {
    check_and_recover_expired(config, monitor);

    let lock_path = config.lock_path();
    if lock_path.exists() {
        match LockRecord::from_file(&lock_path) {
            Ok(existing) => match classify(&existing, monitor, config.lock_timeout_secs) {
                Classification::LiveUnexpired => {
                    return Err(LatchError::LockHeld {
                        age: existing.age_string(),
                        holder_pid: existing.holder_pid,
                        owner: existing.owner,
                    });
                }
                Classification::Stale => {
                    let _ = fs::remove_file(&lock_path);
                    append_event_best_effort(
                        config,
                        &Event::new(EventAction::StaleRecovered).with_details(json!({
                            "holder_pid": existing.holder_pid,
                            "resource_pid": existing.resource_pid,
                        })),
                    );
                }
                Classification::Expired => {
                    // The clock moved between the sweep above and this read.
                    recover_expired(config, monitor, &existing);
                }
            },
            Err(_) => {
                // An unreadable record names nobody we could defer to.
                eprintln!(
                    "Warning: removing unreadable lock record '{}'",
                    lock_path.display()
                );
                let _ = fs::remove_file(&lock_path);
            }
        }
    }

    let record = LockRecord::reserved();
    create_exclusive(config, &record)?;
    Ok(record)
}

/// Write the provisional record with `create_new` semantics.
///
/// Exclusive creation is what closes the check-then-write race: of two
/// orchestrators racing past the recovery sweep, only one can create the
/// file, and the loser fails with `LockHeld`.
fn create_exclusive(config: &Config, record: &LockRecord) -> Result<()> {
    let lock_path = config.lock_path();

    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            LatchError::UserError(format!(
                "failed to create state directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                match LockRecord::from_file(&lock_path) {
                    Ok(existing) => LatchError::LockHeld {
                        age: existing.age_string(),
                        holder_pid: existing.holder_pid,
                        owner: existing.owner,
                    },
                    Err(_) => LatchError::UserError(format!(
                        "lock record '{}' appeared mid-acquire and is unreadable",
                        lock_path.display()
                    )),
                }
            } else {
                LatchError::UserError(format!(
                    "failed to create lock record '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = record.to_json()?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(&lock_path);
            LatchError::UserError(format!("failed to write lock record: {}", e))
        })
}

/// Release the lock and stop the browser. Idempotent: safe to call with no
/// record, no browser, or both already gone; never fails.
///
/// This is the all-exit-paths cleanup primitive, so it only warns on the
/// failures it cannot do anything about.
pub fn release(config: &Config, monitor: &dyn ProcessMonitor) {
    let lock_path = config.lock_path();
    let resource_pid = LockRecord::from_file(&lock_path)
        .ok()
        .and_then(|r| r.resource_pid);

    browser::stop(config, resource_pid, monitor);

    match fs::remove_file(&lock_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!(
            "Warning: failed to remove lock record '{}': {}",
            lock_path.display(),
            e
        ),
    }

    append_event_best_effort(
        config,
        &Event::new(EventAction::Released).with_details(json!({
            "resource_pid": resource_pid,
        })),
    );
}

/// Read-only snapshot of lock and browser state.
#[derive(Debug, Clone)]
pub struct LockStatus {
    /// Whether a lock record exists at the well-known path.
    pub locked: bool,
    /// The record itself, when present and readable.
    pub record: Option<LockRecord>,
    /// Record present but neither pid names a running process.
    pub stale: bool,
    /// Record present but older than the configured expiry.
    pub expired: bool,
    /// Whether the browser answers on its debugging port right now.
    pub resource_healthy: bool,
    /// Version string the browser advertises, when healthy.
    pub browser_version: Option<String>,
}

/// Report lock and browser state without mutating either.
///
/// Staleness and expiry are reported explicitly rather than silently treated
/// as "unlocked"; recovery stays the acquirer's job.
pub fn status(config: &Config, monitor: &dyn ProcessMonitor) -> LockStatus {
    let lock_path = config.lock_path();
    let exists = lock_path.exists();
    let record = exists
        .then(|| LockRecord::from_file(&lock_path).ok())
        .flatten();

    let (stale, expired) = match &record {
        Some(r) => match classify(r, monitor, config.lock_timeout_secs) {
            Classification::LiveUnexpired => (false, false),
            Classification::Stale => (true, false),
            Classification::Expired => (false, true),
        },
        None => (false, false),
    };

    let version = browser::health::fetch_version(config.cdp_port);

    LockStatus {
        locked: exists,
        stale,
        expired,
        resource_healthy: version.is_some(),
        browser_version: version.and_then(|v| v.browser),
        record,
    }
}

/// Force-release an expired lock before any acquire attempt.
///
/// Expiry guards against a hung consumer that never signals completion; the
/// forced release stops the reserved browser even though its pids may still
/// report alive. This sweep is what makes the system self-healing without an
/// external reaper.
pub fn check_and_recover_expired(config: &Config, monitor: &dyn ProcessMonitor) {
    let lock_path = config.lock_path();
    if !lock_path.exists() {
        return;
    }

    if let Ok(record) = LockRecord::from_file(&lock_path)
        && record.is_expired(config.lock_timeout_secs)
    {
        recover_expired(config, monitor, &record);
    }
}

fn recover_expired(config: &Config, monitor: &dyn ProcessMonitor, record: &LockRecord) {
    eprintln!(
        "Warning: lock held by {} (pid {}) expired after {} - force-releasing",
        record.owner,
        record.holder_pid,
        record.age_string()
    );

    browser::stop(config, record.resource_pid, monitor);
    let _ = fs::remove_file(config.lock_path());

    append_event_best_effort(
        config,
        &Event::new(EventAction::ExpiredRecovered).with_details(json!({
            "holder_pid": record.holder_pid,
            "resource_pid": record.resource_pid,
            "age_seconds": record.age().num_seconds(),
        })),
    );
}

/// Hand lock ownership to the consumer process.
///
/// The orchestrator calls this right after spawning the consumer so a
/// concurrent `status` reflects the true owner, and so the lock stays live
/// for exactly as long as the consumer does.
pub fn rebind_holder(config: &Config, pid: u32) -> Result<()> {
    let lock_path = config.lock_path();
    let mut record = LockRecord::from_file(&lock_path)?;
    record.holder_pid = pid;
    record.state = LockState::Bound;
    atomic_write(&lock_path, record.to_json()?.as_bytes())
}
