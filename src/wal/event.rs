//! Logged mutation events.
//!
//! An [`Event`] is the unit of the transaction log: one mutation applied to
//! the store, tagged with the sequence number the writer thread assigned to
//! it. Callers construct events with a placeholder sequence of zero; the
//! real number exists only once the event has been handed to the log.

use crate::wal::codec;

// ============================================================
// Event Kind
// ============================================================

/// The mutation a log record describes.
///
/// The discriminant doubles as the on-disk kind byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// Remove a key from the store.
    Delete = 0,
    /// Insert or overwrite a key.
    Put = 1,
}

impl EventKind {
    /// Decode a kind byte read back from the log.
    pub fn from_byte(byte: u8) -> Option<EventKind> {
        match byte {
            0 => Some(EventKind::Delete),
            1 => Some(EventKind::Put),
            _ => None,
        }
    }
}

// ============================================================
// Event
// ============================================================

/// A single record in the transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Strictly increasing across the life of the log. Assigned by the
    /// writer thread at append time; zero until then.
    pub sequence: u64,
    /// Which mutation this record describes.
    pub kind: EventKind,
    /// Key bytes, at most [`codec::MAX_FIELD_LEN`] long.
    pub key: Vec<u8>,
    /// Value bytes; empty for deletes.
    pub value: Vec<u8>,
}

impl Event {
    /// An insert-or-overwrite event awaiting its sequence number.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Event {
        Event {
            sequence: 0,
            kind: EventKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A removal event awaiting its sequence number.
    pub fn delete(key: impl Into<Vec<u8>>) -> Event {
        Event {
            sequence: 0,
            kind: EventKind::Delete,
            key: key.into(),
            value: Vec::new(),
        }
    }

    /// Size of this event once encoded, in bytes.
    pub fn encoded_len(&self) -> usize {
        codec::RECORD_PREFIX_LEN + self.key.len() + codec::LEN_FIELD_LEN + self.value.len()
    }
}

// ============================================================
// Tests
// ============================================================
