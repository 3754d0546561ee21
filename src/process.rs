//! Process liveness probes and termination.
//!
//! The lock manager decides staleness by asking whether the recorded pids
//! still name running processes, and release paths need graceful-then-forced
//! termination. Both capabilities live behind [`ProcessMonitor`] so tests can
//! substitute a stub instead of spawning real processes.

use std::time::{Duration, Instant};

/// Poll interval while waiting out a termination grace period.
const GRACE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Liveness and termination capability used by the lock manager and the
/// browser supervisor.
pub trait ProcessMonitor {
    /// Whether `pid` currently names a running process on this host.
    fn is_alive(&self, pid: u32) -> bool;

    /// Terminate `pid`: polite signal first, escalating to a forced kill once
    /// `grace` has elapsed. Returns true once the process is gone.
    fn terminate(&self, pid: u32, grace: Duration) -> bool;
}

/// [`ProcessMonitor`] backed by the operating system's process APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProcessMonitor;

#[cfg(unix)]
impl ProcessMonitor for OsProcessMonitor {
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        // Signal 0 probes existence without delivering anything. EPERM means
        // the process exists but belongs to someone else, which still counts.
        let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
        if ret != 0 {
            return std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
        }
        // A zombie still answers signal 0 but is already dead for our purposes.
        !is_zombie(pid)
    }

    fn terminate(&self, pid: u32, grace: Duration) -> bool {
        if !self.is_alive(pid) {
            return true;
        }

        unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if !self.is_alive(pid) {
                return true;
            }
            std::thread::sleep(GRACE_POLL_INTERVAL);
        }

        unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
        std::thread::sleep(GRACE_POLL_INTERVAL);
        !self.is_alive(pid)
    }
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        // comm may contain spaces or parens; the state letter is the first
        // field after the last closing paren.
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .is_some_and(|state| state == "Z"),
        Err(_) => false,
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: u32) -> bool {
    false
}

#[cfg(windows)]
impl ProcessMonitor for OsProcessMonitor {
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        let output = std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .output();
        match output {
            Ok(out) => String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()),
            Err(_) => false,
        }
    }

    fn terminate(&self, pid: u32, grace: Duration) -> bool {
        if !self.is_alive(pid) {
            return true;
        }

        let _ = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string()])
            .output();

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if !self.is_alive(pid) {
                return true;
            }
            std::thread::sleep(GRACE_POLL_INTERVAL);
        }

        let _ = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .output();
        std::thread::sleep(GRACE_POLL_INTERVAL);
        !self.is_alive(pid)
    }
}
