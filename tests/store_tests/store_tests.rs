//! Tests for the Store
//!
//! These tests verify:
//! - Basic get/put/delete semantics and command execution
//! - Restart: a restored store matches the pre-shutdown state exactly
//! - The ephemeral (null-log) store works and forgets
//! - Rejected and refused writes leave the map untouched
//! - Concurrent readers and writers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ledgerkv::protocol::Command;
use ledgerkv::wal::codec;
use ledgerkv::{Config, LedgerError, Store, SyncStrategy, TransactionLog};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn durable_config(path: &Path) -> Config {
    Config::builder()
        .wal_path(path)
        .bandwidth(16)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build()
}

fn open_store(config: &Config) -> Store {
    let log = TransactionLog::open(config).unwrap();
    let mut store = Store::new(log);
    store.restore().unwrap();
    store
}

fn setup_temp_store() -> (TempDir, PathBuf, Store) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("store.wal");
    let store = open_store(&durable_config(&wal_path));
    (temp_dir, wal_path, store)
}

fn setup_ephemeral_store() -> Store {
    open_store(&Config::builder().ephemeral().build())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_store_put_get() {
    let (_temp, _path, store) = setup_temp_store();

    store.put(b"hello", b"world").unwrap();
    assert_eq!(store.get(b"hello").unwrap(), b"world");
}

#[test]
fn test_store_get_missing_key() {
    let (_temp, _path, store) = setup_temp_store();

    assert!(matches!(
        store.get(b"nonexistent"),
        Err(LedgerError::KeyNotFound)
    ));
}

#[test]
fn test_store_put_overwrite() {
    let (_temp, _path, store) = setup_temp_store();

    store.put(b"key", b"value1").unwrap();
    store.put(b"key", b"value2").unwrap();

    assert_eq!(store.get(b"key").unwrap(), b"value2");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_store_delete() {
    let (_temp, _path, store) = setup_temp_store();

    store.put(b"key", b"value").unwrap();
    store.delete(b"key").unwrap();

    assert!(matches!(store.get(b"key"), Err(LedgerError::KeyNotFound)));
    assert!(store.is_empty());
}

#[test]
fn test_store_delete_missing_key_is_not_an_error() {
    let (_temp, _path, store) = setup_temp_store();

    store.delete(b"never-existed").unwrap();
}

#[test]
fn test_store_execute_commands() {
    let (_temp, _path, store) = setup_temp_store();

    let put = Command::Put {
        key: b"k".to_vec(),
        value: b"v".to_vec(),
    };
    assert_eq!(store.execute(put).unwrap(), None);

    let get = Command::Get { key: b"k".to_vec() };
    assert_eq!(store.execute(get).unwrap(), Some(b"v".to_vec()));

    assert_eq!(store.execute(Command::Ping).unwrap(), Some(b"PONG".to_vec()));

    let delete = Command::Delete { key: b"k".to_vec() };
    assert_eq!(store.execute(delete).unwrap(), None);
    assert!(store.is_empty());
}

// =============================================================================
// Restart / Restore Tests
// =============================================================================

#[test]
fn test_restart_restores_exact_state() {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("store.wal");
    let config = durable_config(&wal_path);

    {
        let store = open_store(&config);
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();
        store.put(b"a", b"3").unwrap();
        store.delete(b"b").unwrap();
        store.shutdown(Duration::from_secs(10)).unwrap();
    }

    let store = open_store(&config);
    assert_eq!(store.get(b"a").unwrap(), b"3");
    assert!(matches!(store.get(b"b"), Err(LedgerError::KeyNotFound)));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_restore_runs_exactly_once() {
    let (_temp, _path, mut store) = setup_temp_store();

    assert!(matches!(
        store.restore(),
        Err(LedgerError::InvalidState(_))
    ));
}

#[test]
fn test_corrupt_log_fails_restore() {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("store.wal");

    // sequence goes backwards between the two records
    let mut file = std::fs::File::create(&wal_path).unwrap();
    let mut first = ledgerkv::wal::Event::put("a", "1");
    first.sequence = 9;
    codec::write_event(&mut file, &first).unwrap();
    let mut second = ledgerkv::wal::Event::put("b", "2");
    second.sequence = 4;
    codec::write_event(&mut file, &second).unwrap();
    drop(file);

    let log = TransactionLog::open(&durable_config(&wal_path)).unwrap();
    let mut store = Store::new(log);
    assert!(matches!(
        store.restore(),
        Err(LedgerError::SequenceOutOfOrder { last: 9, found: 4 })
    ));
}

// =============================================================================
// Ephemeral Store Tests
// =============================================================================

#[test]
fn test_ephemeral_store_serves_without_a_log() {
    let store = setup_ephemeral_store();

    store.put(b"k", b"v").unwrap();
    assert_eq!(store.get(b"k").unwrap(), b"v");
    store.delete(b"k").unwrap();
    assert!(store.is_empty());

    // nothing to drain, so even a zero deadline closes cleanly
    store.shutdown(Duration::ZERO).unwrap();
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_oversized_value_is_rejected_and_map_is_untouched() {
    let (_temp, _path, store) = setup_temp_store();

    let huge = vec![0u8; codec::MAX_FIELD_LEN + 1];
    assert!(matches!(
        store.put(b"key", &huge),
        Err(LedgerError::FieldTooLong { field: "value", .. })
    ));

    assert!(matches!(store.get(b"key"), Err(LedgerError::KeyNotFound)));
    assert!(store.is_empty());
}

#[test]
fn test_mutations_after_shutdown_fail_but_reads_still_work() {
    let (_temp, _path, store) = setup_temp_store();

    store.put(b"k", b"v").unwrap();
    store.shutdown(Duration::from_secs(10)).unwrap();

    assert!(matches!(store.put(b"k2", b"v2"), Err(LedgerError::LogClosed)));
    assert!(matches!(store.delete(b"k"), Err(LedgerError::LogClosed)));

    // the map was untouched by the refused writes, and reads are free of
    // the log entirely
    assert_eq!(store.get(b"k").unwrap(), b"v");
    assert_eq!(store.len(), 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_and_readers() {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("store.wal");
    let config = Config::builder()
        .wal_path(&wal_path)
        .bandwidth(4)
        .sync_strategy(SyncStrategy::EveryN { count: 25 })
        .build();

    let store = Arc::new(open_store(&config));

    let mut handles = Vec::new();
    for t in 0..4u32 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..100u32 {
                store
                    .put(format!("t{t}-k{i}").as_bytes(), &i.to_be_bytes())
                    .unwrap();
            }
        }));
    }
    for r in 0..2u32 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            // readers run alongside the writers; values are either absent
            // or exactly what some writer put there
            for i in 0..100u32 {
                match store.get(format!("t{r}-k{i}").as_bytes()) {
                    Ok(value) => assert_eq!(value, i.to_be_bytes()),
                    Err(LedgerError::KeyNotFound) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 400);
    store.shutdown(Duration::from_secs(30)).unwrap();

    // everything the writers put in comes back after a restart
    let restored = open_store(&durable_config(&wal_path));
    assert_eq!(restored.len(), 400);
    assert_eq!(restored.get(b"t3-k99").unwrap(), 99u32.to_be_bytes());
}
