//! Environment-driven configuration for latch.
//!
//! All knobs are plain environment variables with defaults, so shell scripts
//! and CI jobs can steer latch without a config file:
//!
//! - `LATCH_CDP_PORT`: browser debugging port (default 9222)
//! - `LATCH_BROWSER`: browser binary path (auto-detected when unset)
//! - `LATCH_HEADLESS`: `auto`/`true`/`false` (default `auto`)
//! - `LATCH_PROFILE_DIR`: browser profile directory
//! - `LATCH_STATE_DIR`: lock file, pid file, and event log location
//! - `LATCH_LOCK_TIMEOUT`: lock expiry in seconds (default 300)

use crate::error::{LatchError, Result};
use std::path::PathBuf;

/// Default browser debugging port.
pub const DEFAULT_CDP_PORT: u16 = 9222;

/// Default lock expiry in seconds. An acquire older than this is
/// force-recovered even if its processes still report alive.
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 300;

/// Headless-mode selection for browser launches.
///
/// `Auto` defers to the host: no display server means headless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadlessMode {
    #[default]
    Auto,
    On,
    Off,
}

impl HeadlessMode {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(HeadlessMode::Auto),
            "true" | "1" | "yes" | "on" => Ok(HeadlessMode::On),
            "false" | "0" | "no" | "off" => Ok(HeadlessMode::Off),
            other => Err(LatchError::UserError(format!(
                "invalid LATCH_HEADLESS value '{}': expected auto, true, or false",
                other
            ))),
        }
    }
}

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the browser exposes its debugging endpoint on.
    pub cdp_port: u16,

    /// Explicit browser binary; `None` means auto-detect.
    pub browser_path: Option<PathBuf>,

    /// Headless override, or `Auto` to infer from the host display.
    pub headless: HeadlessMode,

    /// Browser profile directory (`--user-data-dir`).
    pub profile_dir: PathBuf,

    /// Directory holding the lock file, browser pid file, and event log.
    pub state_dir: PathBuf,

    /// Seconds after which a lock is considered expired.
    pub lock_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let state_dir = default_state_dir();
        Self {
            cdp_port: DEFAULT_CDP_PORT,
            browser_path: None,
            headless: HeadlessMode::Auto,
            profile_dir: state_dir.join("profile"),
            state_dir,
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Build a configuration from `LATCH_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(port) = std::env::var("LATCH_CDP_PORT") {
            config.cdp_port = port.trim().parse().map_err(|_| {
                LatchError::UserError(format!("invalid LATCH_CDP_PORT value '{}'", port))
            })?;
        }

        if let Ok(path) = std::env::var("LATCH_BROWSER")
            && !path.trim().is_empty()
        {
            config.browser_path = Some(PathBuf::from(path));
        }

        if let Ok(mode) = std::env::var("LATCH_HEADLESS") {
            config.headless = HeadlessMode::parse(&mode)?;
        }

        if let Ok(dir) = std::env::var("LATCH_STATE_DIR")
            && !dir.trim().is_empty()
        {
            config.state_dir = PathBuf::from(dir);
            config.profile_dir = config.state_dir.join("profile");
        }

        // Profile override applies after the state dir so it wins either way.
        if let Ok(dir) = std::env::var("LATCH_PROFILE_DIR")
            && !dir.trim().is_empty()
        {
            config.profile_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = std::env::var("LATCH_LOCK_TIMEOUT") {
            config.lock_timeout_secs = secs.trim().parse().map_err(|_| {
                LatchError::UserError(format!("invalid LATCH_LOCK_TIMEOUT value '{}'", secs))
            })?;
        }

        Ok(config)
    }

    /// Path of the persisted lock record.
    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("browser.lock")
    }

    /// Path of the supervisor's browser pid bookkeeping file.
    pub fn browser_pid_path(&self) -> PathBuf {
        self.state_dir.join("browser.pid")
    }

    /// Path of the append-only audit event log.
    pub fn events_path(&self) -> PathBuf {
        self.state_dir.join("events.ndjson")
    }
}

fn default_state_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME")
        && !home.is_empty()
    {
        return PathBuf::from(home).join(".local").join("state").join("latch");
    }
    std::env::temp_dir().join("latch")
}
