//! The transaction logger.
//!
//! ## Responsibilities
//! - Own the log file and the single writer thread that appends to it
//! - Serialize concurrent mutations through a bounded intake queue
//! - Assign sequence numbers at append time, on the writer thread
//! - Surface writer failures on an error stream without ever deadlocking
//!   the producers
//! - Drain and close within a caller-supplied deadline on shutdown
//!
//! ## Write path
//!
//! ```text
//!   caller                     intake queue            writer thread
//!   ------                     ------------            -------------
//!   write_put ──▶ validate ──▶ [cap = bandwidth] ──▶ assign sequence
//!                 (blocks when full)                  encode + append
//!                                                     fsync per strategy
//!                                                     mark work complete
//! ```
//!
//! A full queue blocks the caller: backpressure, not error. Pending work is
//! counted before an event enters the queue, so a drain that starts while a
//! producer is mid-handoff still waits for that event to reach the file.
//!
//! ## Lifecycle
//!
//! Created ──start()──▶ Running ──shutdown()──▶ Draining ──▶ Closed
//!
//! One way, one shot. A log that timed out draining stays in Draining with
//! the writer still flushing; calling `shutdown` again waits on the same
//! drain with a fresh deadline.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use crate::config::{Config, SyncStrategy};
use crate::error::{LedgerError, Result};
use crate::wal::codec;
use crate::wal::event::Event;
use crate::wal::replay::ReplayEvents;

// ============================================================
// Transaction Log
// ============================================================

/// A durable (or deliberately non-durable) record of store mutations.
///
/// The variant is picked once, from configuration, and the rest of the
/// system talks to the log without caring which one it got.
pub enum TransactionLog {
    /// Append-only file behind a writer thread.
    File(FileLog),
    /// Accepts everything, remembers nothing.
    Null(NullLog),
}

impl TransactionLog {
    /// Build the log the configuration asks for: a file-backed log when a
    /// path is set, the null log otherwise.
    pub fn open(config: &Config) -> Result<TransactionLog> {
        config.validate()?;
        match &config.wal_path {
            Some(path) => Ok(TransactionLog::File(FileLog::open(
                path,
                config.bandwidth,
                config.sync_strategy,
            )?)),
            None => Ok(TransactionLog::Null(NullLog)),
        }
    }

    /// Record an insert-or-overwrite. Blocks while the intake queue is full.
    pub fn write_put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        match self {
            TransactionLog::File(log) => log.write_put(key, value),
            TransactionLog::Null(log) => log.write_put(key, value),
        }
    }

    /// Record a removal. Blocks while the intake queue is full.
    pub fn write_delete(&self, key: &[u8]) -> Result<()> {
        match self {
            TransactionLog::File(log) => log.write_delete(key),
            TransactionLog::Null(log) => log.write_delete(key),
        }
    }

    /// Replay the log from the start. Must be consumed before [`start`].
    ///
    /// [`start`]: TransactionLog::start
    pub fn read_events(&self) -> Result<ReplayEvents> {
        match self {
            TransactionLog::File(log) => log.read_events(),
            TransactionLog::Null(log) => Ok(log.read_events()),
        }
    }

    /// Start the writer. Returns the error stream, which the owner must
    /// drain; it closes when the writer exits.
    pub fn start(&self) -> Result<Receiver<LedgerError>> {
        match self {
            TransactionLog::File(log) => log.start(),
            TransactionLog::Null(log) => Ok(log.start()),
        }
    }

    /// Stop accepting writes, flush what was accepted, close the file.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        match self {
            TransactionLog::File(log) => log.shutdown(timeout),
            TransactionLog::Null(log) => log.shutdown(timeout),
        }
    }
}

// ============================================================
// Pending Work Counter
// ============================================================

/// Count of accepted-but-not-yet-durable writes.
///
/// Producers register work before enqueueing it; the writer completes work
/// after the bytes are in the file. Shutdown waits here.
struct PendingWork {
    count: Mutex<usize>,
    drained: Condvar,
}

impl PendingWork {
    fn new() -> PendingWork {
        PendingWork {
            count: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    fn register_one(&self) {
        *self.count.lock() += 1;
    }

    fn complete_one(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    /// Block until nothing is pending or the deadline passes. On timeout
    /// the number still pending comes back as the error.
    fn wait_drained(&self, deadline: Instant) -> std::result::Result<(), usize> {
        let mut count = self.count.lock();
        while *count > 0 {
            if self.drained.wait_until(&mut count, deadline).timed_out() {
                if *count == 0 {
                    return Ok(());
                }
                return Err(*count);
            }
        }
        Ok(())
    }
}

// ============================================================
// File Log
// ============================================================

/// Where in its one-way lifecycle the log is, plus the resources owned at
/// that point.
enum LifeState {
    /// Opened, not yet started. The file waits here for the writer thread.
    Created { file: File },
    /// Writer running; `intake` is the only sender the producers share.
    Running {
        intake: Sender<Event>,
        writer: JoinHandle<()>,
    },
    /// Intake closed, writer flushing the backlog.
    Draining { writer: JoinHandle<()> },
    /// Drained, joined, file closed.
    Closed,
}

/// Append-only file log with a dedicated writer thread.
pub struct FileLog {
    path: PathBuf,
    bandwidth: usize,
    sync: SyncStrategy,
    state: Mutex<LifeState>,
    pending: Arc<PendingWork>,
    /// Set by the writer thread when an append or sync fails. The file is
    /// not trusted after that; writes are refused.
    failed: Arc<AtomicBool>,
    /// Next sequence to assign, seeded by replay.
    next_sequence: Arc<AtomicU64>,
    replayed: AtomicBool,
}

impl FileLog {
    /// Open (creating if absent) the log file at `path`.
    ///
    /// `bandwidth` is the intake queue capacity: how many accepted writes
    /// may wait for the writer thread before producers block.
    pub fn open(path: impl AsRef<Path>, bandwidth: usize, sync: SyncStrategy) -> Result<FileLog> {
        if bandwidth < 1 {
            return Err(LedgerError::Config(
                "bandwidth must be at least 1".to_string(),
            ));
        }
        if let SyncStrategy::EveryN { count } = sync {
            if count < 1 {
                return Err(LedgerError::Config(
                    "sync interval must be at least 1".to_string(),
                ));
            }
        }

        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!("opened transaction log at {}", path.display());

        Ok(FileLog {
            path,
            bandwidth,
            sync,
            state: Mutex::new(LifeState::Created { file }),
            pending: Arc::new(PendingWork::new()),
            failed: Arc::new(AtomicBool::new(false)),
            next_sequence: Arc::new(AtomicU64::new(0)),
            replayed: AtomicBool::new(false),
        })
    }

    /// Replay every record already in the file, oldest first.
    ///
    /// Allowed exactly once, and only before [`start`]. Consume the iterator
    /// to completion: the highest sequence it sees is where the writer picks
    /// up numbering.
    ///
    /// [`start`]: FileLog::start
    pub fn read_events(&self) -> Result<ReplayEvents> {
        {
            let state = self.state.lock();
            if !matches!(*state, LifeState::Created { .. }) {
                return Err(LedgerError::InvalidState(
                    "replay must happen before the writer starts",
                ));
            }
        }
        if self.replayed.swap(true, Ordering::SeqCst) {
            return Err(LedgerError::InvalidState(
                "the transaction log was already replayed",
            ));
        }

        // replay reads through its own handle; the append handle stays
        // parked in the Created state untouched
        let file = File::open(&self.path)?;
        Ok(ReplayEvents::from_file(file, Arc::clone(&self.next_sequence)))
    }

    /// Hand the file to the writer thread and open the intake queue.
    ///
    /// Returns the error stream. At most one failure report ever arrives on
    /// it, and it closes when the writer exits; the owner must read it to
    /// completion or writer failures go unseen.
    pub fn start(&self) -> Result<Receiver<LedgerError>> {
        if !self.replayed.load(Ordering::SeqCst) {
            return Err(LedgerError::InvalidState(
                "the log must be replayed before the writer starts",
            ));
        }

        let mut state = self.state.lock();
        let file = match std::mem::replace(&mut *state, LifeState::Closed) {
            LifeState::Created { file } => file,
            other => {
                *state = other;
                return Err(LedgerError::InvalidState("the writer was already started"));
            }
        };

        let (intake_tx, intake_rx) = channel::bounded(self.bandwidth);
        // unbounded so the writer never blocks reporting; it sends at most
        // one append failure and one final-sync failure
        let (error_tx, error_rx) = channel::unbounded();

        let pending = Arc::clone(&self.pending);
        let failed = Arc::clone(&self.failed);
        let first_sequence = self.next_sequence.load(Ordering::SeqCst);
        let sync = self.sync;

        let writer = thread::Builder::new()
            .name("wal-writer".to_string())
            .spawn(move || run_writer(file, intake_rx, error_tx, pending, failed, first_sequence, sync))?;

        *state = LifeState::Running {
            intake: intake_tx,
            writer,
        };
        tracing::info!(
            "transaction log started: next sequence {first_sequence}, bandwidth {}",
            self.bandwidth
        );
        Ok(error_rx)
    }

    /// Record an insert-or-overwrite. Blocks while the intake queue is full.
    pub fn write_put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.submit(Event::put(key, value))
    }

    /// Record a removal. Blocks while the intake queue is full.
    pub fn write_delete(&self, key: &[u8]) -> Result<()> {
        self.submit(Event::delete(key))
    }

    fn submit(&self, event: Event) -> Result<()> {
        // reject oversized fields before the event goes anywhere near the
        // queue; the file never sees a partial record for them
        codec::check_event(&event)?;

        if self.failed.load(Ordering::SeqCst) {
            return Err(LedgerError::LogClosed);
        }

        let state = self.state.lock();
        let LifeState::Running { intake, .. } = &*state else {
            return Err(LedgerError::LogClosed);
        };

        // registered before the handoff so a drain racing with us still
        // counts this write; the send blocks under the state lock, which
        // keeps shutdown from closing the intake out from under it
        self.pending.register_one();
        if intake.send(event).is_err() {
            // only possible if the writer thread died without draining
            self.pending.complete_one();
            return Err(LedgerError::LogClosed);
        }
        Ok(())
    }

    /// Stop accepting writes, wait for the backlog to reach the file, then
    /// join the writer and close the file.
    ///
    /// On [`LedgerError::ShutdownTimeout`] the writer is still flushing and
    /// the file stays open; a later call waits again with a new deadline.
    /// Once closed, further calls return `Ok` immediately.
    pub fn shutdown(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LifeState::Closed) {
                LifeState::Created { file } => {
                    // never started: nothing queued, close the handle and go
                    drop(file);
                    tracing::debug!("transaction log closed before start");
                    return Ok(());
                }
                LifeState::Running { intake, writer } => {
                    // dropping the only sender is the off switch: submit()
                    // now refuses, and the writer exits once the queue is
                    // empty
                    drop(intake);
                    *state = LifeState::Draining { writer };
                    tracing::info!("transaction log draining");
                }
                LifeState::Draining { writer } => {
                    *state = LifeState::Draining { writer };
                }
                LifeState::Closed => return Ok(()),
            }
        }

        if let Err(still_pending) = self.pending.wait_drained(deadline) {
            // the writer keeps flushing; the file must not be closed under
            // it, so report and leave the drain running
            tracing::warn!("transaction log drain timed out with {still_pending} writes pending");
            return Err(LedgerError::ShutdownTimeout {
                pending: still_pending,
            });
        }

        let writer = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LifeState::Closed) {
                LifeState::Draining { writer } => Some(writer),
                // a concurrent shutdown finished the job first
                LifeState::Closed => None,
                other => {
                    *state = other;
                    None
                }
            }
        };

        if let Some(writer) = writer {
            // queue is empty and the intake is closed, so this join is
            // prompt; the final sync and the close happen on the way out
            if writer.join().is_err() {
                return Err(LedgerError::InvalidState("the log writer thread panicked"));
            }
            tracing::info!("transaction log drained and closed");
        }
        Ok(())
    }
}

// ============================================================
// Writer Thread
// ============================================================

fn run_writer(
    mut file: File,
    intake: Receiver<Event>,
    errors: Sender<LedgerError>,
    pending: Arc<PendingWork>,
    failed: Arc<AtomicBool>,
    first_sequence: u64,
    sync: SyncStrategy,
) {
    let mut next_sequence = first_sequence;
    let mut since_sync = 0usize;
    let mut dead = false;

    for mut event in intake.iter() {
        if dead {
            // a write already failed; keep consuming so no producer stays
            // blocked on a full queue, but nothing more reaches the file
            pending.complete_one();
            continue;
        }

        event.sequence = next_sequence;
        next_sequence += 1;

        if let Err(err) = append_event(&mut file, &event, sync, &mut since_sync) {
            tracing::error!("transaction log append failed: {err}");
            failed.store(true, Ordering::SeqCst);
            // the owner may already be gone; that is their loss, not a
            // reason to block the drain
            let _ = errors.send(err);
            dead = true;
        }
        pending.complete_one();
    }

    if !dead {
        if let Err(err) = file.sync_all() {
            tracing::error!("transaction log final sync failed: {err}");
            failed.store(true, Ordering::SeqCst);
            let _ = errors.send(err.into());
        }
    }
    // the file handle drops here: the log is closed exactly when its
    // writer is gone
}

fn append_event(
    file: &mut File,
    event: &Event,
    sync: SyncStrategy,
    since_sync: &mut usize,
) -> Result<()> {
    codec::write_event(file, event)?;
    match sync {
        SyncStrategy::EveryWrite => file.sync_all()?,
        SyncStrategy::EveryN { count } => {
            *since_sync += 1;
            if *since_sync >= count {
                file.sync_all()?;
                *since_sync = 0;
            }
        }
    }
    Ok(())
}

// ============================================================
// Null Log
// ============================================================

/// The log used when durability is switched off: every write is accepted
/// and none is remembered. Replay yields nothing, shutdown is instant.
pub struct NullLog;

impl NullLog {
    pub fn write_put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }

    pub fn write_delete(&self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    pub fn read_events(&self) -> ReplayEvents {
        ReplayEvents::empty()
    }

    /// An error stream that is already closed: nothing can fail.
    pub fn start(&self) -> Receiver<LedgerError> {
        let (tx, rx) = channel::unbounded();
        drop(tx);
        rx
    }

    pub fn shutdown(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// Tests
// ============================================================
