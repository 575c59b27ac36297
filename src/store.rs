//! Store Module
//!
//! The in-memory key-value store and its coupling to the transaction log.
//!
//! ## Responsibilities
//! - Serve gets from an in-memory map
//! - Log every mutation before applying it
//! - Rebuild the map from the log on startup
//! - Hand shutdown through to the log

use std::collections::HashMap;
use std::time::Duration;

use crossbeam::channel::Receiver;
use parking_lot::RwLock;

use crate::error::{LedgerError, Result};
use crate::protocol::Command;
use crate::shutdown::Shutdown;
use crate::wal::{EventKind, TransactionLog};

/// The key-value store.
///
/// ## Concurrency Model: Write-Ahead, Writer-Blocking
///
/// - **Reads** (get): Concurrent, through the map's read lock; never touch
///   the log
/// - **Writes** (put/delete): Serialized by the map's write lock. The
///   mutation is handed to the log *before* the map changes, under that
///   lock, so queue order and map order agree and a rejected event never
///   dirties the map. When the log's intake queue is full the handoff
///   blocks, which stalls writers but leaves readers untouched: that is
///   the backpressure path.
pub struct Store {
    /// Live key-value data (internal RwLock)
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,

    /// Every mutation goes here first
    log: TransactionLog,
}

impl Store {
    /// A store backed by the given log. Empty until [`restore`] runs.
    ///
    /// [`restore`]: Store::restore
    pub fn new(log: TransactionLog) -> Store {
        Store {
            data: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Rebuild the map from the log, then start the log's writer.
    ///
    /// Taking `&mut self` keeps this strictly before any serving: a shared
    /// store cannot exist until restore has run. Returns the log's error
    /// stream; the owner must drain it.
    ///
    /// On a corrupt log this fails without starting the writer, and the
    /// store must not be used.
    pub fn restore(&mut self) -> Result<Receiver<LedgerError>> {
        let events = self.log.read_events()?;

        let data = self.data.get_mut();
        let mut applied = 0u64;
        for event in events {
            let event = event?;
            match event.kind {
                EventKind::Put => {
                    data.insert(event.key, event.value);
                }
                EventKind::Delete => {
                    data.remove(&event.key);
                }
            }
            applied += 1;
        }
        tracing::info!("store restored: {applied} events applied, {} keys live", data.len());

        self.log.start()
    }

    /// Execute a protocol command against the store.
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some(b"PONG".to_vec())),
        }
    }

    /// Get the value stored under a key.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let data = self.data.read();
        data.get(key).cloned().ok_or(LedgerError::KeyNotFound)
    }

    /// Insert or overwrite a key.
    ///
    /// Blocks while the log's intake queue is full.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write();

        // log first: if the event is rejected or the log is closed, the
        // map stays exactly as it was
        self.log.write_put(key, value)?;

        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    /// Remove a key. Removing an absent key is not an error.
    ///
    /// Blocks while the log's intake queue is full.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut data = self.data.write();

        self.log.write_delete(key)?;

        data.remove(key);
        Ok(())
    }

    /// Drain the log and close it within `timeout`.
    ///
    /// On [`LedgerError::ShutdownTimeout`] the drain keeps running; call
    /// again with a fresh deadline to finish the close.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.log.shutdown(timeout)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when no keys are live
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Shutdown for Store {
    fn shutdown(&self, timeout: Duration) -> Result<()> {
        Store::shutdown(self, timeout)
    }
}
