//! Binary codec for transaction log records.
//!
//! ## Record layout
//!
//! Every record has the same shape, all integers big-endian:
//!
//! ```text
//! +----------+------+---------+-----~~----+-----------+-----~~-----+
//! | sequence | kind | key_len |    key    | value_len |   value     |
//! |  8 bytes | 1 B  | 2 bytes | key_len B |  2 bytes  | value_len B |
//! +----------+------+---------+-----~~----+-----------+-----~~-----+
//! ```
//!
//! There is no file header, no delimiter and no checksum: the log is a bare
//! concatenation of records, and a record is valid exactly when every byte
//! of it could be read. Field lengths are capped at [`MAX_FIELD_LEN`] by the
//! 2-byte length prefixes; oversized fields are rejected before a single
//! byte reaches the sink.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{LedgerError, Result};
use crate::wal::event::{Event, EventKind};

// ============================================================
// Layout Constants
// ============================================================

/// Fixed bytes ahead of the key: sequence (8) + kind (1) + key length (2).
pub const RECORD_PREFIX_LEN: usize = 11;

/// Width of a length prefix.
pub const LEN_FIELD_LEN: usize = 2;

/// Longest key or value the record layout can carry.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

// ============================================================
// Encoding
// ============================================================

/// Validate the field lengths of an event without encoding it.
pub fn check_event(event: &Event) -> Result<()> {
    check_field_len("key", event.key.len())?;
    check_field_len("value", event.value.len())?;
    Ok(())
}

fn check_field_len(field: &'static str, len: usize) -> Result<()> {
    if len > MAX_FIELD_LEN {
        return Err(LedgerError::FieldTooLong {
            field,
            len,
            max: MAX_FIELD_LEN,
        });
    }
    Ok(())
}

/// Encode one event into a standalone buffer.
///
/// Validation runs before any byte is produced, so a rejected event leaves
/// nothing behind.
pub fn encode_event(event: &Event) -> Result<Bytes> {
    check_event(event)?;

    let mut buf = BytesMut::with_capacity(event.encoded_len());
    buf.put_u64(event.sequence);
    buf.put_u8(event.kind as u8);
    buf.put_u16(event.key.len() as u16);
    buf.put_slice(&event.key);
    buf.put_u16(event.value.len() as u16);
    buf.put_slice(&event.value);

    Ok(buf.freeze())
}

/// Append one event to a sink as a single write.
///
/// On [`LedgerError::FieldTooLong`] the sink is untouched.
pub fn write_event<W: Write>(writer: &mut W, event: &Event) -> Result<()> {
    let record = encode_event(event)?;
    writer.write_all(&record)?;
    Ok(())
}

// ============================================================
// Decoding
// ============================================================

/// Read the next record from a source positioned at a record boundary.
///
/// Returns `Ok(None)` when the source is exhausted before the first byte of
/// a record: that is the ordinary end of the log, not an error. A source
/// that ends partway through a record yields
/// [`LedgerError::TruncatedRecord`] carrying the byte offset where the
/// record started. `offset` must hold that starting offset on entry and is
/// advanced past the record on success.
pub fn read_event<R: Read>(reader: &mut R, offset: &mut u64) -> Result<Option<Event>> {
    let mut prefix = [0u8; RECORD_PREFIX_LEN];
    let got = read_fully(reader, &mut prefix)?;
    if got == 0 {
        return Ok(None);
    }
    if got < RECORD_PREFIX_LEN {
        return Err(LedgerError::TruncatedRecord { offset: *offset });
    }

    let mut head = &prefix[..];
    let sequence = head.get_u64();
    let kind_byte = head.get_u8();
    let key_len = head.get_u16() as usize;

    let kind = EventKind::from_byte(kind_byte).ok_or(LedgerError::InvalidEventKind(kind_byte))?;

    let mut key = vec![0u8; key_len];
    if read_fully(reader, &mut key)? < key_len {
        return Err(LedgerError::TruncatedRecord { offset: *offset });
    }

    let mut len_buf = [0u8; LEN_FIELD_LEN];
    if read_fully(reader, &mut len_buf)? < LEN_FIELD_LEN {
        return Err(LedgerError::TruncatedRecord { offset: *offset });
    }
    let value_len = u16::from_be_bytes(len_buf) as usize;

    let mut value = vec![0u8; value_len];
    if read_fully(reader, &mut value)? < value_len {
        return Err(LedgerError::TruncatedRecord { offset: *offset });
    }

    *offset += (RECORD_PREFIX_LEN + key_len + LEN_FIELD_LEN + value_len) as u64;

    Ok(Some(Event {
        sequence,
        kind,
        key,
        value,
    }))
}

/// Fill `buf` from the reader, stopping early only at end of input.
///
/// Unlike `read_exact` this reports how many bytes actually arrived, which
/// is what lets the caller tell a clean end of log from a torn record.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ============================================================
// Tests
// ============================================================
