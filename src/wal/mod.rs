//! Write-Ahead Log (WAL) Module
//!
//! The durable event log behind the store: every mutation becomes a binary
//! record appended by a single writer thread, and startup replays the file
//! to rebuild state.
//!
//! ## Responsibilities
//! - Encode and decode mutation events in a fixed binary layout
//! - Serialize concurrent writes through one bounded intake queue
//! - Assign strictly increasing sequence numbers at append time
//! - Replay the file on startup, in write order, verifying that ordering
//! - Drain and close within a deadline on shutdown
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Record 1                                                  │
//! │ ┌──────────┬──────┬─────────┬─────┬───────────┬───────┐   │
//! │ │ Seq (8)  │ K (1)│ KLen (2)│ Key │ VLen (2)  │ Value │   │
//! │ └──────────┴──────┴─────────┴─────┴───────────┴───────┘   │
//! ├───────────────────────────────────────────────────────────┤
//! │ Record 2                                                  │
//! │ ┌──────────┬──────┬─────────┬─────┬───────────┬───────┐   │
//! │ │ Seq (8)  │ K (1)│ KLen (2)│ Key │ VLen (2)  │ Value │   │
//! │ └──────────┴──────┴─────────┴─────┴───────────┴───────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod codec;
mod event;
mod logger;
mod replay;

pub use codec::{MAX_FIELD_LEN, RECORD_PREFIX_LEN};
pub use event::{Event, EventKind};
pub use logger::{FileLog, NullLog, TransactionLog};
pub use replay::ReplayEvents;
