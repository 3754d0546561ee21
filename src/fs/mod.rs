//! Filesystem helpers for latch.
//!
//! The lock record is rewritten in place twice per run (resource binding,
//! holder handoff); those rewrites go through `atomic_write` so a concurrent
//! `status` never reads a torn record.

mod atomic;

pub use atomic::atomic_write;
