//! Tests for startup replay
//!
//! These tests verify:
//! - Replay returns exactly what was written, in write order
//! - A torn tail (partial final record) is reported, not skipped
//! - Ordering violations in the file stop replay at the bad record
//! - A garbage kind byte is rejected
//!
//! Corrupt files are built by hand with the record codec so the failures
//! land at known offsets.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use ledgerkv::wal::{codec, Event, EventKind, FileLog};
use ledgerkv::{LedgerError, SyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("test.wal");
    (temp_dir, log_path)
}

/// Write raw records straight to disk, bypassing the writer thread.
fn craft_log(path: &PathBuf, records: &[(u64, EventKind, &[u8], &[u8])]) {
    let mut file = File::create(path).unwrap();
    for (sequence, kind, key, value) in records {
        let mut event = match kind {
            EventKind::Put => Event::put(*key, *value),
            EventKind::Delete => Event::delete(*key),
        };
        event.sequence = *sequence;
        codec::write_event(&mut file, &event).unwrap();
    }
    file.flush().unwrap();
}

fn replay(path: &PathBuf) -> Vec<Result<Event, LedgerError>> {
    let log = FileLog::open(path, 4, SyncStrategy::EveryWrite).unwrap();
    log.read_events().unwrap().collect()
}

// =============================================================================
// Happy Path Tests
// =============================================================================

#[test]
fn test_replay_round_trips_through_the_logger() {
    let (_temp, log_path) = setup_temp_log();

    {
        let log = FileLog::open(&log_path, 8, SyncStrategy::EveryWrite).unwrap();
        log.read_events().unwrap().for_each(drop);
        log.start().unwrap();
        log.write_put(b"alpha", b"1").unwrap();
        log.write_put(b"beta", b"2").unwrap();
        log.write_delete(b"alpha").unwrap();
        log.shutdown(Duration::from_secs(10)).unwrap();
    }

    let events: Vec<Event> = replay(&log_path).into_iter().map(|e| e.unwrap()).collect();
    assert_eq!(events.len(), 3);

    assert_eq!(events[0].kind, EventKind::Put);
    assert_eq!(events[0].key, b"alpha");
    assert_eq!(events[0].value, b"1");

    assert_eq!(events[1].key, b"beta");

    assert_eq!(events[2].kind, EventKind::Delete);
    assert_eq!(events[2].key, b"alpha");
    assert!(events[2].value.is_empty());
}

#[test]
fn test_replay_of_a_fresh_log_is_empty() {
    let (_temp, log_path) = setup_temp_log();

    // FileLog::open creates the file, so replay of a fresh log is empty
    let outcomes = replay(&log_path);
    assert!(outcomes.is_empty());
}

#[test]
fn test_replay_accepts_sequence_gaps() {
    let (_temp, log_path) = setup_temp_log();
    craft_log(
        &log_path,
        &[
            (2, EventKind::Put, b"a", b"1"),
            (7, EventKind::Put, b"b", b"2"),
            (40, EventKind::Delete, b"a", b""),
        ],
    );

    let events: Vec<Event> = replay(&log_path).into_iter().map(|e| e.unwrap()).collect();
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].sequence, 40);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_repeated_sequence_stops_replay() {
    let (_temp, log_path) = setup_temp_log();
    craft_log(
        &log_path,
        &[
            (1, EventKind::Put, b"a", b"1"),
            (1, EventKind::Put, b"b", b"2"),
        ],
    );

    let mut outcomes = replay(&log_path).into_iter();
    assert!(outcomes.next().unwrap().is_ok());
    match outcomes.next().unwrap() {
        Err(LedgerError::SequenceOutOfOrder { last: 1, found: 1 }) => {}
        other => panic!("expected SequenceOutOfOrder, got {other:?}"),
    }
    assert!(outcomes.next().is_none());
}

#[test]
fn test_backwards_sequence_stops_replay_before_later_valid_records() {
    let (_temp, log_path) = setup_temp_log();
    craft_log(
        &log_path,
        &[
            (5, EventKind::Put, b"a", b"1"),
            (3, EventKind::Put, b"b", b"2"),
            (9, EventKind::Put, b"c", b"3"),
        ],
    );

    let outcomes = replay(&log_path);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    assert!(matches!(
        outcomes[1],
        Err(LedgerError::SequenceOutOfOrder { last: 5, found: 3 })
    ));
}

#[test]
fn test_torn_tail_reports_truncation_at_the_right_offset() {
    let (_temp, log_path) = setup_temp_log();
    craft_log(
        &log_path,
        &[
            (0, EventKind::Put, b"whole", b"record"),
            (1, EventKind::Put, b"torn", b"record"),
        ],
    );

    let mut first = Event::put("whole", "record");
    first.sequence = 0;
    let first_len = first.encoded_len() as u64;

    // chop mid-way through the second record, as a crash would
    let full = std::fs::metadata(&log_path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&log_path).unwrap();
    file.set_len(full - 4).unwrap();
    drop(file);

    let outcomes = replay(&log_path);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    match &outcomes[1] {
        Err(LedgerError::TruncatedRecord { offset }) => assert_eq!(*offset, first_len),
        other => panic!("expected TruncatedRecord, got {other:?}"),
    }
}

#[test]
fn test_garbage_kind_byte_stops_replay() {
    let (_temp, log_path) = setup_temp_log();
    craft_log(&log_path, &[(0, EventKind::Put, b"good", b"v")]);

    // append a record whose kind byte is garbage
    let mut bad = Event::put("bad", "v");
    bad.sequence = 1;
    let mut bytes = codec::encode_event(&bad).unwrap().to_vec();
    bytes[8] = 0x7f;
    let mut file = std::fs::OpenOptions::new().append(true).open(&log_path).unwrap();
    file.write_all(&bytes).unwrap();
    drop(file);

    let outcomes = replay(&log_path);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    assert!(matches!(
        outcomes[1],
        Err(LedgerError::InvalidEventKind(0x7f))
    ));
}
