//! Lock record persistence and age bookkeeping.

use crate::error::{LatchError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Two-phase lifecycle of a lock record.
///
/// `Reserved` is written at acquire time, before the browser pid is known;
/// `Bound` once the record points at the live resource. Modeling the phase
/// explicitly keeps the refinement window auditable from `status` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Reserved,
    Bound,
}

/// The persisted lock record. At most one exists at the well-known path;
/// its presence means the browser is reserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    /// Owner of the lock (e.g. `user@HOST`).
    pub owner: String,

    /// Process that took the lock: the CLI, the orchestrator, or the
    /// consumer once ownership is handed off to it.
    pub holder_pid: u32,

    /// Pid of the supervised browser; `None` until known (and it stays
    /// `None` for an adopted browser whose pid cannot be discovered).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_pid: Option<u32>,

    /// Timestamp when the lock was taken (RFC3339).
    pub acquired_at: DateTime<Utc>,

    /// Reservation phase, see [`LockState`].
    pub state: LockState,
}

impl LockRecord {
    /// Create a provisional record held by the current process.
    pub fn reserved() -> Self {
        Self {
            owner: get_owner_string(),
            holder_pid: std::process::id(),
            resource_pid: None,
            acquired_at: Utc::now(),
            state: LockState::Reserved,
        }
    }

    /// Parse a lock record from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            LatchError::UserError(format!(
                "failed to read lock record '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            LatchError::UserError(format!(
                "failed to parse lock record '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Serialize the record to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LatchError::UserError(format!("failed to serialize lock record: {}", e)))
    }

    /// Age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();

        if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds.max(0))
        }
    }

    /// Whether the record is older than the configured expiry, regardless of
    /// whether its processes are still alive.
    pub fn is_expired(&self, timeout_secs: u64) -> bool {
        self.age().num_seconds() > timeout_secs as i64
    }
}

/// Get the owner string used in lock records and audit events.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
