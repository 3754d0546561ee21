//! Error types for the latch CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for latch operations.
///
/// Each variant maps to a specific exit code. Stale and expired locks are not
/// errors: both are recovered inside `acquire` (silently for stale, with a
/// warning for expired). A consumer timeout is not an error either; it is an
/// exit-code classification of `run`.
#[derive(Error, Debug)]
pub enum LatchError {
    /// User provided invalid arguments or the configuration is unusable.
    #[error("{0}")]
    UserError(String),

    /// A live, unexpired lock record belongs to another process.
    #[error("lock is held by {owner} (pid {holder_pid}, acquired {age} ago)\nRun `latch release` to force-release it.")]
    LockHeld {
        owner: String,
        holder_pid: u32,
        age: String,
    },

    /// The browser could not be started or never became healthy within the
    /// probe budget.
    #[error("browser launch failed: {0}")]
    LaunchFailed(String),
}

impl LatchError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LatchError::UserError(_) => exit_codes::USER_ERROR,
            LatchError::LockHeld { .. } => exit_codes::LOCK_HELD,
            LatchError::LaunchFailed(_) => exit_codes::LAUNCH_FAILURE,
        }
    }
}

/// Result type alias for latch operations.
pub type Result<T> = std::result::Result<T, LatchError>;
