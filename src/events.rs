//! Append-only audit log of lock transitions.
//!
//! Events are stored in NDJSON format (one JSON object per line) in
//! `<state_dir>/events.ndjson`. Every object carries:
//! - `ts`: RFC3339 timestamp
//! - `action`: the transition (acquired, released, run_complete, ...)
//! - `actor`: the owner string (`user@HOST`)
//! - `details`: freeform object with action-specific fields
//!
//! Logging is best-effort throughout: call sites print a `Warning:` line on
//! failure and carry on, so a full disk can never wedge the lock itself.

use crate::config::Config;
use crate::error::{LatchError, Result};
use crate::lock::get_owner_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Lock transitions recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Lock acquired and browser running.
    Acquired,
    /// Lock and browser released.
    Released,
    /// A stale record (no live pids) was swept before acquiring.
    StaleRecovered,
    /// An over-age record was force-released before acquiring.
    ExpiredRecovered,
    /// Consumer process dispatched under the lock.
    RunStarted,
    /// Consumer finished on its own.
    RunCompleted,
    /// Watchdog killed the consumer.
    RunTimedOut,
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The transition that was recorded.
    pub action: EventAction,

    /// Who recorded it (e.g. `user@HOST`).
    pub actor: String,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, stamped now.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_owner_string(),
            details: Value::Null,
        }
    }

    /// Attach action-specific details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Append an event to the audit log, creating the log on first use.
pub fn append_event(config: &Config, event: &Event) -> Result<()> {
    let path = config.events_path();

    if let Some(parent) = path.parent()
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

    let line = serde_json::to_string(event).map_err(|e| {
        LatchError::UserError(format!("failed to serialize event: {}", e))
    })?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            LatchError::UserError(format!(
                "failed to open event log '{}': {}",
                path.display(),
                e
            ))
        })?;

    writeln!(file, "{}", line).map_err(|e| {
        LatchError::UserError(format!(
            "failed to append to event log '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Append an event, downgrading failures to a stderr warning.
pub fn append_event_best_effort(config: &Config, event: &Event) {
    if let Err(e) = append_event(config, event) {
        eprintln!("Warning: failed to log {:?} event: {}", event.action, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(temp: &TempDir) -> Config {
        Config {
            state_dir: temp.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn events_append_as_ndjson() {
        let temp = TempDir::new().unwrap();
        let config = test_config(&temp);

        append_event(&config, &Event::new(EventAction::Acquired)).unwrap();
        append_event(
            &config,
            &Event::new(EventAction::Released).with_details(json!({"resource_pid": 4321})),
        )
        .unwrap();

        let content = fs::read_to_string(config.events_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Event = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.action, EventAction::Acquired);
        assert!(!first.actor.is_empty());

        let second: Event = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.action, EventAction::Released);
        assert_eq!(second.details["resource_pid"], 4321);
    }

    #[test]
    fn append_creates_state_directory() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            state_dir: temp.path().join("deep").join("state"),
            ..Config::default()
        };

        append_event(&config, &Event::new(EventAction::RunStarted)).unwrap();

        assert!(config.events_path().exists());
    }
}
