//! Locking subsystem for latch.
//!
//! A single lock record at a well-known path serializes access to the shared
//! browser. The record is created with **create_new** semantics (exclusive
//! create) so concurrent acquires resolve to exactly one winner, and it is
//! classified on every acquire:
//!
//! - **live**: holder or browser pid names a running process, and the record
//!   is younger than the expiry - acquisition fails with `LockHeld`.
//! - **stale**: neither pid is running - recovered silently.
//! - **expired**: older than `LATCH_LOCK_TIMEOUT` - force-released with a
//!   warning, even if the pids still report alive.
//!
//! There is no RAII guard here on purpose: the record must outlive the
//! acquiring process (the consumer inherits ownership), so release is an
//! explicit, idempotent operation that every exit path calls.

mod manager;
mod record;

#[cfg(test)]
mod tests;

pub use manager::{
    LockStatus, acquire, check_and_recover_expired, rebind_holder, release, status,
};
pub use record::{LockRecord, LockState};

pub(crate) use record::get_owner_string;
