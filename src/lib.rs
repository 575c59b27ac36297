//! # LedgerKV
//!
//! An in-memory key-value store made durable by a write-ahead transaction
//! log:
//! - Every mutation is appended to a binary event log before it is applied
//! - A single writer thread serializes concurrent writes through a bounded
//!   queue, so a busy log pushes back instead of falling behind
//! - Startup replays the log to rebuild the exact pre-crash state
//! - Shutdown drains accepted writes to disk within a deadline
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Store                                  │
//! │        (RwLock map; log-before-apply on mutation)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ write_put / write_delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Transaction Log                             │
//! │   intake queue (bounded) ──▶ writer thread ──▶ append-only   │
//! │                                               log file      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod store;
pub mod shutdown;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, SyncStrategy};
pub use error::{LedgerError, Result};
pub use shutdown::{Coordinator, Shutdown};
pub use store::Store;
pub use wal::TransactionLog;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LedgerKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
