//! Browser process supervision: launch, adopt, and terminate.

use super::discovery::resolve_browser;
use super::health;
use crate::config::{Config, HeadlessMode};
use crate::error::{LatchError, Result};
use crate::process::ProcessMonitor;
use std::fs;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Interval between health probes while waiting for a launched browser.
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Number of health probes before a launch is declared failed.
const HEALTH_POLL_ATTEMPTS: u32 = 24;

/// Grace period between SIGTERM and SIGKILL when stopping the tracked pid.
const STOP_GRACE: Duration = Duration::from_secs(3);

/// Shorter grace for pids found only by the port sweep.
const SWEEP_GRACE: Duration = Duration::from_secs(1);

/// Make sure a debuggable browser is listening on the configured port.
///
/// Adopts a healthy browser that already answers (idempotent against
/// manually-started instances) instead of spawning a duplicate; the adopted
/// pid is recovered from the pid file or the port, `0` if neither knows it.
/// Otherwise launches a new browser and polls `/json/version` until it
/// answers or the retry budget runs out.
pub fn ensure_running(config: &Config, monitor: &dyn ProcessMonitor) -> Result<u32> {
    if health::is_healthy(config.cdp_port) {
        return Ok(discover_pid(config, monitor));
    }

    let binary = resolve_browser(config)?;

    fs::create_dir_all(&config.profile_dir).map_err(|e| {
        LatchError::UserError(format!(
            "failed to create profile directory '{}': {}",
            config.profile_dir.display(),
            e
        ))
    })?;

    let mut args = vec![
        format!("--remote-debugging-port={}", config.cdp_port),
        format!("--user-data-dir={}", config.profile_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ];
    if headless_enabled(config.headless) {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }

    let mut cmd = Command::new(&binary);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // Own process group so the browser outlives the acquiring shell.
    #[cfg(unix)]
    std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

    let mut child = cmd.spawn().map_err(|e| {
        LatchError::LaunchFailed(format!("failed to launch '{}': {}", binary.display(), e))
    })?;

    let pid = child.id();
    if let Err(e) = fs::write(config.browser_pid_path(), format!("{}\n", pid)) {
        eprintln!("Warning: failed to write browser pid file: {}", e);
    }

    for _ in 0..HEALTH_POLL_ATTEMPTS {
        std::thread::sleep(HEALTH_POLL_INTERVAL);

        if let Ok(Some(status)) = child.try_wait() {
            let _ = fs::remove_file(config.browser_pid_path());
            return Err(LatchError::LaunchFailed(format!(
                "browser exited before its debugging endpoint came up (status: {})",
                status
            )));
        }

        if health::is_healthy(config.cdp_port) {
            return Ok(pid);
        }
    }

    // Past the budget: don't leave a half-started browser bound to the port.
    let _ = child.kill();
    let _ = child.wait();
    let _ = fs::remove_file(config.browser_pid_path());
    Err(LatchError::LaunchFailed(format!(
        "browser never became healthy on port {} within {:.0?}",
        config.cdp_port,
        HEALTH_POLL_INTERVAL * HEALTH_POLL_ATTEMPTS
    )))
}

/// Stop the browser: tracked pid first, then anything still bound to the
/// port. Termination is graceful-then-forced throughout, and the sweep
/// covers the case where the tracked pid diverged from reality.
pub fn stop(config: &Config, tracked_pid: Option<u32>, monitor: &dyn ProcessMonitor) {
    let mut stopped = Vec::new();

    if let Some(pid) = tracked_pid
        && pid > 0
    {
        monitor.terminate(pid, STOP_GRACE);
        stopped.push(pid);
    }

    if let Some(pid) = read_pid_file(config)
        && !stopped.contains(&pid)
    {
        monitor.terminate(pid, STOP_GRACE);
        stopped.push(pid);
    }

    for pid in pids_on_port(config.cdp_port) {
        if !stopped.contains(&pid) {
            monitor.terminate(pid, SWEEP_GRACE);
            stopped.push(pid);
        }
    }

    let _ = fs::remove_file(config.browser_pid_path());
}

/// Best-effort pid discovery for an adopted browser: the supervisor's pid
/// file if it names a live process, otherwise whoever owns the port.
fn discover_pid(config: &Config, monitor: &dyn ProcessMonitor) -> u32 {
    if let Some(pid) = read_pid_file(config)
        && monitor.is_alive(pid)
    {
        return pid;
    }

    pids_on_port(config.cdp_port).first().copied().unwrap_or(0)
}

fn read_pid_file(config: &Config) -> Option<u32> {
    fs::read_to_string(config.browser_pid_path())
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Pids of processes listening on `port`. Degrades to empty when the
/// platform tooling is unavailable.
#[cfg(unix)]
pub fn pids_on_port(port: u16) -> Vec<u32> {
    let output = match Command::new("lsof")
        .args(["-ti", &format!(":{}", port)])
        .output()
    {
        Ok(out) => out,
        Err(_) => return Vec::new(),
    };

    if !output.status.success() {
        return Vec::new();
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

#[cfg(windows)]
pub fn pids_on_port(port: u16) -> Vec<u32> {
    let output = match Command::new("netstat").args(["-ano"]).output() {
        Ok(out) => out,
        Err(_) => return Vec::new(),
    };

    let needle = format!(":{}", port);
    let mut pids = Vec::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if line.contains(&needle)
            && line.contains("LISTENING")
            && let Some(pid) = line.split_whitespace().last().and_then(|p| p.parse::<u32>().ok())
            && !pids.contains(&pid)
        {
            pids.push(pid);
        }
    }
    pids
}

/// Whether a launch should run headless.
///
/// An explicit override wins; `Auto` infers from display-server presence.
pub fn headless_enabled(mode: HeadlessMode) -> bool {
    match mode {
        HeadlessMode::On => true,
        HeadlessMode::Off => false,
        HeadlessMode::Auto => !display_available(),
    }
}

fn display_available() -> bool {
    if cfg!(windows) || cfg!(target_os = "macos") {
        return true;
    }
    let set = |key: &str| std::env::var(key).is_ok_and(|v| !v.is_empty());
    set("DISPLAY") || set("WAYLAND_DISPLAY")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::OsProcessMonitor;
    use crate::test_support::FakeCdpEndpoint;
    use serial_test::serial;
    use tempfile::TempDir;

    fn test_config(temp: &TempDir, port: u16) -> Config {
        Config {
            cdp_port: port,
            state_dir: temp.path().to_path_buf(),
            profile_dir: temp.path().join("profile"),
            ..Config::default()
        }
    }

    #[test]
    fn adopts_an_already_healthy_endpoint() {
        let endpoint = FakeCdpEndpoint::spawn();
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, endpoint.port);

        ensure_running(&config, &OsProcessMonitor).unwrap();

        // Adoption spawns nothing: the endpoint stays up, and no pid file is
        // written (that only happens for launches we performed).
        assert!(endpoint.is_listening());
        assert!(!config.browser_pid_path().exists());
    }

    #[test]
    fn adoption_prefers_a_live_pid_file() {
        let endpoint = FakeCdpEndpoint::spawn();
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp, endpoint.port);

        // The test process itself is certainly alive.
        let own_pid = std::process::id();
        fs::write(config.browser_pid_path(), format!("{}\n", own_pid)).unwrap();

        let pid = ensure_running(&config, &OsProcessMonitor).unwrap();
        assert_eq!(pid, own_pid);
    }

    #[test]
    fn launch_fails_when_no_browser_exists() {
        let temp = TempDir::new().unwrap();
        // Bind-then-drop: nothing answers on this port.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = test_config(&temp, port);
        config.browser_path = Some(temp.path().join("no-such-browser"));

        let err = ensure_running(&config, &OsProcessMonitor).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn stop_is_safe_with_nothing_running() {
        let temp = TempDir::new().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = test_config(&temp, port);

        // No pid file, no listener, no tracked pid: must not panic or hang.
        stop(&config, None, &OsProcessMonitor);
        stop(&config, Some(0), &OsProcessMonitor);
    }

    #[test]
    fn stop_removes_the_pid_file() {
        let temp = TempDir::new().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = test_config(&temp, port);
        fs::write(config.browser_pid_path(), "999999999\n").unwrap();

        stop(&config, None, &OsProcessMonitor);

        assert!(!config.browser_pid_path().exists());
    }

    #[test]
    #[serial]
    fn headless_overrides_beat_the_display_heuristic() {
        assert!(headless_enabled(HeadlessMode::On));
        assert!(!headless_enabled(HeadlessMode::Off));
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn headless_auto_follows_the_display_env() {
        let saved_display = std::env::var("DISPLAY").ok();
        let saved_wayland = std::env::var("WAYLAND_DISPLAY").ok();

        unsafe {
            std::env::remove_var("DISPLAY");
            std::env::remove_var("WAYLAND_DISPLAY");
        }
        assert!(headless_enabled(HeadlessMode::Auto));

        unsafe { std::env::set_var("DISPLAY", ":0") };
        assert!(!headless_enabled(HeadlessMode::Auto));

        unsafe {
            match saved_display {
                Some(v) => std::env::set_var("DISPLAY", v),
                None => std::env::remove_var("DISPLAY"),
            }
            match saved_wayland {
                Some(v) => std::env::set_var("WAYLAND_DISPLAY", v),
                None => std::env::remove_var("WAYLAND_DISPLAY"),
            }
        }
    }
}
