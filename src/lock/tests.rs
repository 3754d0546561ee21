//! Tests for the locking subsystem.

use super::manager::{Classification, classify, reserve};
use super::*;
use crate::config::Config;
use crate::process::ProcessMonitor;
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tempfile::TempDir;

/// Monitor whose notion of "alive" is exactly the pids it was given.
struct AliveMonitor(Vec<u32>);

impl ProcessMonitor for AliveMonitor {
    fn is_alive(&self, pid: u32) -> bool {
        self.0.contains(&pid)
    }

    fn terminate(&self, _pid: u32, _grace: Duration) -> bool {
        true
    }
}

fn nobody() -> AliveMonitor {
    AliveMonitor(Vec::new())
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn test_config(temp: &TempDir) -> Config {
    Config {
        cdp_port: closed_port(),
        state_dir: temp.path().to_path_buf(),
        profile_dir: temp.path().join("profile"),
        ..Config::default()
    }
}

fn record_with(holder_pid: u32, resource_pid: Option<u32>, age_secs: i64) -> LockRecord {
    LockRecord {
        owner: "user@host".to_string(),
        holder_pid,
        resource_pid,
        acquired_at: Utc::now() - ChronoDuration::seconds(age_secs),
        state: LockState::Bound,
    }
}

#[test]
fn reserved_record_names_the_current_process() {
    let record = LockRecord::reserved();

    assert!(!record.owner.is_empty());
    assert_eq!(record.holder_pid, std::process::id());
    assert!(record.resource_pid.is_none());
    assert_eq!(record.state, LockState::Reserved);
    assert!(record.age().num_seconds() < 5);
}

#[test]
fn record_serializes_and_parses_back() {
    let record = record_with(1234, Some(5678), 0);
    let json = record.to_json().unwrap();

    assert!(json.contains("holder_pid"));
    assert!(json.contains("resource_pid"));
    assert!(json.contains("bound"));

    let parsed: LockRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.holder_pid, 1234);
    assert_eq!(parsed.resource_pid, Some(5678));
    assert_eq!(parsed.state, LockState::Bound);
}

#[test]
fn unknown_resource_pid_is_omitted_from_json() {
    let record = record_with(1234, None, 0);
    let json = record.to_json().unwrap();
    assert!(!json.contains("resource_pid"));
}

#[test]
fn age_string_scales_with_age() {
    let fresh = record_with(1, None, 12);
    assert_eq!(fresh.age_string(), "12s");

    let minutes = record_with(1, None, 150);
    assert_eq!(minutes.age_string(), "2m 30s");

    let hours = record_with(1, None, 2 * 3600 + 5 * 60);
    assert_eq!(hours.age_string(), "2h 5m");
}

#[test]
fn expiry_is_a_pure_function_of_age() {
    let record = record_with(1, None, 100);
    assert!(!record.is_expired(300));
    assert!(record.is_expired(60));
}

#[test]
fn classify_live_when_holder_is_running() {
    let record = record_with(100, None, 0);
    let result = classify(&record, &AliveMonitor(vec![100]), 300);
    assert_eq!(result, Classification::LiveUnexpired);
}

#[test]
fn classify_live_when_only_the_resource_is_running() {
    // The holder shell exited but the browser is still up: the consumer
    // inherits ownership and the lock stays held.
    let record = record_with(100, Some(200), 0);
    let result = classify(&record, &AliveMonitor(vec![200]), 300);
    assert_eq!(result, Classification::LiveUnexpired);
}

#[test]
fn classify_stale_when_both_pids_are_dead() {
    let record = record_with(100, Some(200), 0);
    let result = classify(&record, &nobody(), 300);
    assert_eq!(result, Classification::Stale);
}

#[test]
fn classify_expired_even_when_pids_are_alive() {
    let record = record_with(100, Some(200), 400);
    let result = classify(&record, &AliveMonitor(vec![100, 200]), 300);
    assert_eq!(result, Classification::Expired);
}

#[test]
fn reserve_succeeds_on_an_empty_system() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let record = reserve(&config, &nobody()).unwrap();

    assert_eq!(record.state, LockState::Reserved);
    assert!(config.lock_path().exists());

    let on_disk = LockRecord::from_file(config.lock_path()).unwrap();
    assert_eq!(on_disk.holder_pid, record.holder_pid);
}

#[test]
fn reserve_fails_while_a_live_lock_exists() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let own_pid = std::process::id();

    reserve(&config, &AliveMonitor(vec![own_pid])).unwrap();

    // Second taker sees a live, unexpired record.
    let err = reserve(&config, &AliveMonitor(vec![own_pid])).unwrap_err();
    match err {
        crate::error::LatchError::LockHeld { holder_pid, .. } => {
            assert_eq!(holder_pid, own_pid);
        }
        other => panic!("expected LockHeld, got {:?}", other),
    }

    // The loser must not have clobbered the winner's record.
    assert!(config.lock_path().exists());
}

#[test]
fn reserve_recovers_a_stale_lock() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let dead = record_with(999_999_991, Some(999_999_992), 10);
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(config.lock_path(), dead.to_json().unwrap()).unwrap();

    let record = reserve(&config, &nobody()).unwrap();

    assert_eq!(record.holder_pid, std::process::id());
    let on_disk = LockRecord::from_file(config.lock_path()).unwrap();
    assert_eq!(on_disk.holder_pid, record.holder_pid);
}

#[test]
fn reserve_recovers_an_expired_lock_despite_live_pids() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    // Both pids report alive, but the record is older than the expiry:
    // the hung-consumer guard forces recovery anyway.
    let hung = record_with(100, Some(200), 400);
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(config.lock_path(), hung.to_json().unwrap()).unwrap();

    let mut config = config;
    config.lock_timeout_secs = 300;

    let record = reserve(&config, &AliveMonitor(vec![100, 200])).unwrap();
    assert_eq!(record.holder_pid, std::process::id());
}

#[test]
fn reserve_sweeps_an_unreadable_record() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(config.lock_path(), "not json at all").unwrap();

    let record = reserve(&config, &nobody()).unwrap();
    assert_eq!(record.holder_pid, std::process::id());
}

#[test]
fn release_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    // Nothing held: releasing must not fail.
    release(&config, &nobody());
    release(&config, &nobody());
    assert!(!config.lock_path().exists());

    // Held: releasing clears the record; releasing again is still fine.
    reserve(&config, &nobody()).unwrap();
    release(&config, &nobody());
    assert!(!config.lock_path().exists());
    release(&config, &nobody());
}

#[test]
fn check_and_recover_expired_removes_only_over_age_records() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    std::fs::create_dir_all(&config.state_dir).unwrap();

    // Fresh record survives the sweep.
    let fresh = record_with(100, None, 10);
    std::fs::write(config.lock_path(), fresh.to_json().unwrap()).unwrap();
    check_and_recover_expired(&config, &AliveMonitor(vec![100]));
    assert!(config.lock_path().exists());

    // Over-age record is force-released.
    let hung = record_with(100, None, 400);
    std::fs::write(config.lock_path(), hung.to_json().unwrap()).unwrap();
    check_and_recover_expired(&config, &AliveMonitor(vec![100]));
    assert!(!config.lock_path().exists());
}

#[test]
fn status_reports_an_unlocked_system() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let status = status(&config, &nobody());

    assert!(!status.locked);
    assert!(status.record.is_none());
    assert!(!status.stale);
    assert!(!status.expired);
    assert!(!status.resource_healthy);
}

#[test]
fn status_reports_staleness_without_mutating() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let dead = record_with(999_999_991, None, 10);
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(config.lock_path(), dead.to_json().unwrap()).unwrap();

    let snapshot = status(&config, &nobody());

    assert!(snapshot.locked);
    assert!(snapshot.stale);
    assert!(!snapshot.expired);
    // Read-only: the stale record is still there for acquire to recover.
    assert!(config.lock_path().exists());
}

#[test]
fn status_reports_expiry() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    let hung = record_with(100, None, 400);
    std::fs::create_dir_all(&config.state_dir).unwrap();
    std::fs::write(config.lock_path(), hung.to_json().unwrap()).unwrap();

    let snapshot = status(&config, &AliveMonitor(vec![100]));

    assert!(snapshot.locked);
    assert!(snapshot.expired);
    assert!(!snapshot.stale);
}

#[test]
fn rebind_holder_hands_the_lock_to_the_consumer() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    reserve(&config, &nobody()).unwrap();
    rebind_holder(&config, 43210).unwrap();

    let on_disk = LockRecord::from_file(config.lock_path()).unwrap();
    assert_eq!(on_disk.holder_pid, 43210);
    assert_eq!(on_disk.state, LockState::Bound);
}

#[test]
fn rebind_holder_fails_without_a_record() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);

    assert!(rebind_holder(&config, 43210).is_err());
}
