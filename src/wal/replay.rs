//! Startup replay of the transaction log.
//!
//! [`ReplayEvents`] walks the log file front to back and yields every record
//! in write order, enforcing as it goes the one structural invariant of the
//! format: sequence numbers strictly increase. The iterator is fused on
//! error, since nothing after the first bad record can be trusted, and it
//! feeds each sequence number it sees back into the log so that appends made
//! after recovery continue the numbering instead of restarting it.

use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{LedgerError, Result};
use crate::wal::codec;
use crate::wal::event::Event;

// ============================================================
// Replay Iterator
// ============================================================

/// Iterator over the records of a transaction log, in write order.
///
/// Yields `Err` at most once: the first corrupt record ends the walk. A
/// clean end of file ends it with `None`.
pub struct ReplayEvents {
    inner: Option<ReplayState>,
}

struct ReplayState {
    reader: BufReader<File>,
    /// Byte offset of the next record, for truncation reports.
    offset: u64,
    last_sequence: Option<u64>,
    recovered: u64,
    /// Where the writer should pick up numbering, shared with the log.
    next_sequence: Arc<AtomicU64>,
}

impl ReplayEvents {
    pub(crate) fn from_file(file: File, next_sequence: Arc<AtomicU64>) -> ReplayEvents {
        ReplayEvents {
            inner: Some(ReplayState {
                reader: BufReader::new(file),
                offset: 0,
                last_sequence: None,
                recovered: 0,
                next_sequence,
            }),
        }
    }

    /// A replay with nothing to yield, for logs that keep no file.
    pub(crate) fn empty() -> ReplayEvents {
        ReplayEvents { inner: None }
    }
}

impl Iterator for ReplayEvents {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        // taking the state out fuses the iterator on both end and error;
        // it goes back in only when another record may follow
        let mut state = self.inner.take()?;
        match state.read_next() {
            Ok(Some(event)) => {
                self.inner = Some(state);
                Some(Ok(event))
            }
            Ok(None) => {
                tracing::debug!(
                    "transaction log replay complete: {} events, {} bytes",
                    state.recovered,
                    state.offset
                );
                None
            }
            Err(err) => Some(Err(err)),
        }
    }
}

impl ReplayState {
    fn read_next(&mut self) -> Result<Option<Event>> {
        let Some(event) = codec::read_event(&mut self.reader, &mut self.offset)? else {
            return Ok(None);
        };

        if let Some(last) = self.last_sequence {
            if event.sequence <= last {
                return Err(LedgerError::SequenceOutOfOrder {
                    last,
                    found: event.sequence,
                });
            }
        }
        self.last_sequence = Some(event.sequence);
        self.recovered += 1;

        // appends after recovery must continue the numbering
        self.next_sequence.store(event.sequence + 1, Ordering::SeqCst);

        Ok(Some(event))
    }
}

// ============================================================
// Tests
// ============================================================
