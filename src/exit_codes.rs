//! Exit code constants for the latch CLI.
//!
//! - 0: Success
//! - 1: User error (bad arguments, unusable configuration)
//! - 2: Launch failure (browser never became healthy)
//! - 4: Lock acquisition failure (held by another process)
//! - 124: Consumer killed by the run watchdog
//!
//! A `run` that finishes before the watchdog fires propagates the consumer's
//! own exit code verbatim instead of any of these.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or unusable configuration.
pub const USER_ERROR: i32 = 1;

/// Launch failure: the browser never answered on its debugging port within
/// the probe budget.
pub const LAUNCH_FAILURE: i32 = 2;

/// Lock acquisition failure: a live, unexpired lock belongs to another process.
pub const LOCK_HELD: i32 = 4;

/// The watchdog killed the consumer. Matches coreutils `timeout` so callers
/// can tell the watchdog from a consumer's own failure exit codes.
pub const TIMEOUT: i32 = 124;
