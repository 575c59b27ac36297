//! Error types for ledgerkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for ledgerkv operations
#[derive(Debug, Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// Lookup miss. Recoverable; surfaced to the caller, never logged as an
    /// error.
    #[error("key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    /// A key or value exceeds the maximum encodable length. Rejected before
    /// any byte reaches the log.
    #[error("{field} is too long: {len} bytes (max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    // -------------------------------------------------------------------------
    // Replay Errors (all fatal to replay)
    // -------------------------------------------------------------------------
    /// The log ended partway through a record. Distinct from a clean
    /// end-of-log, which is not an error.
    #[error("truncated record at offset {offset}")]
    TruncatedRecord { offset: u64 },

    /// A replayed sequence number did not strictly increase.
    #[error("sequence out of order: read {found} after {last}")]
    SequenceOutOfOrder { last: u64, found: u64 },

    /// A record carried a kind byte outside the known enumeration.
    #[error("invalid event kind byte: 0x{0:02x}")]
    InvalidEventKind(u8),

    // -------------------------------------------------------------------------
    // Transaction Log Errors
    // -------------------------------------------------------------------------
    /// The log is not accepting writes (not yet started, draining, closed,
    /// or failed).
    #[error("transaction log is not accepting writes")]
    LogClosed,

    /// A lifecycle method was called in the wrong state.
    #[error("invalid transaction log state: {0}")]
    InvalidState(&'static str),

    /// The shutdown deadline expired with work still in flight: queued
    /// writes for the log, open connections for the server.
    #[error("shutdown timed out with {pending} still in flight")]
    ShutdownTimeout { pending: usize },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Whether this error means the log contents cannot be trusted past the
    /// point where it occurred.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            LedgerError::TruncatedRecord { .. }
                | LedgerError::SequenceOutOfOrder { .. }
                | LedgerError::InvalidEventKind(_)
        )
    }
}
