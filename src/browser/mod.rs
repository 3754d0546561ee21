//! Browser resource supervision.
//!
//! The browser is an externally-visible shared resource: it may have been
//! started by us, by a previous holder, or by hand. This module makes
//! acquisition idempotent against all three - `ensure_running` adopts a
//! healthy endpoint instead of spawning a duplicate, and `stop` sweeps the
//! port so a diverged pid never leaves an orphan bound to it.

mod discovery;
pub mod health;
mod supervisor;

pub use supervisor::{ensure_running, headless_enabled, pids_on_port, stop};
