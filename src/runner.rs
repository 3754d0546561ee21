//! End-to-end run orchestration: acquire, supervise, release.
//!
//! One run walks `IDLE -> ACQUIRING -> RUNNING -> {COMPLETED | TIMED_OUT |
//! LOCK_DENIED} -> RELEASING -> DONE`. The consumer is an independent child
//! process raced against a poll-based watchdog; whichever loses is actively
//! cleaned up (the watchdog simply stops being consulted, the consumer is
//! terminated). `LOCK_DENIED` is the one terminal state that skips both
//! RUNNING and RELEASING, because nothing was acquired.

use crate::config::Config;
use crate::error::{LatchError, Result};
use crate::events::{Event, EventAction, append_event_best_effort};
use crate::exit_codes;
use crate::lock;
use crate::process::ProcessMonitor;
use serde_json::json;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

/// Interval between consumer exit checks while the watchdog is armed.
const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Grace period between the polite termination signal and the forced kill
/// when the watchdog fires.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Terminal classification of a supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The consumer exited on its own with this code.
    Completed(i32),
    /// The watchdog fired and the consumer was terminated.
    TimedOut,
}

impl RunOutcome {
    /// Exit code to report for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(code) => *code,
            RunOutcome::TimedOut => exit_codes::TIMEOUT,
        }
    }
}

/// Run a consumer command under the browser lock with a watchdog deadline.
///
/// Acquire-time failures (`LockHeld`, `LaunchFailed`) propagate immediately
/// with nothing to clean up. Once acquired, the lock is released on every
/// exit path: normal completion, consumer failure, watchdog timeout, and
/// orchestrator errors such as an unspawnable command.
pub fn run(
    config: &Config,
    monitor: &dyn ProcessMonitor,
    command: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<RunOutcome> {
    lock::acquire(config, monitor)?;

    let outcome = supervise(config, command, args, timeout_secs);

    lock::release(config, monitor);

    let outcome = outcome?;
    let action = match outcome {
        RunOutcome::Completed(_) => EventAction::RunCompleted,
        RunOutcome::TimedOut => EventAction::RunTimedOut,
    };
    append_event_best_effort(
        config,
        &Event::new(action).with_details(json!({
            "command": command,
            "exit_code": outcome.exit_code(),
            "timeout_seconds": timeout_secs,
        })),
    );

    Ok(outcome)
}

/// Spawn the consumer, hand it the lock, and race it against the deadline.
fn supervise(
    config: &Config,
    command: &str,
    args: &[String],
    timeout_secs: u64,
) -> Result<RunOutcome> {
    let mut child = Command::new(command).args(args).spawn().map_err(|e| {
        LatchError::UserError(format!(
            "failed to execute consumer '{}': {}\n\
             Fix: ensure the command is installed and in PATH.",
            command, e
        ))
    })?;

    // Refinement write: a concurrent `status` should name the consumer as
    // the holder, and the lock should live exactly as long as it does.
    if let Err(e) = lock::rebind_holder(config, child.id()) {
        eprintln!("Warning: failed to hand the lock to the consumer: {}", e);
    }

    append_event_best_effort(
        config,
        &Event::new(EventAction::RunStarted).with_details(json!({
            "command": command,
            "consumer_pid": child.id(),
            "timeout_seconds": timeout_secs,
        })),
    );

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(RunOutcome::Completed(exit_code_of(status))),
            Ok(None) => {
                if Instant::now() >= deadline {
                    terminate_child(&mut child);
                    return Ok(RunOutcome::TimedOut);
                }
                std::thread::sleep(WATCHDOG_POLL_INTERVAL);
            }
            Err(e) => {
                terminate_child(&mut child);
                return Err(LatchError::UserError(format!(
                    "failed to check consumer status: {}",
                    e
                )));
            }
        }
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    exit_codes::USER_ERROR
}

/// Graceful-then-forced termination of the consumer, reaping it afterwards
/// so no zombie outlives the run.
fn terminate_child(child: &mut Child) {
    #[cfg(unix)]
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }

    let deadline = Instant::now() + KILL_GRACE;
    while Instant::now() < deadline {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        std::thread::sleep(WATCHDOG_POLL_INTERVAL);
    }

    let _ = child.kill();
    let _ = child.wait();
}
