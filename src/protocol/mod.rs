//! Protocol Module
//!
//! The binary wire protocol between clients and the server.
//!
//! ## Request Frame
//! ```text
//! ┌─────────┬───────────┬─────┬─────────────┬───────┐
//! │ Cmd (1) │ KeyLen(2) │ Key │ ValueLen(2) │ Value │
//! └─────────┴───────────┴─────┴─────────────┴───────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET    - value section must be empty
//! - 0x02: PUT    - key and value
//! - 0x03: DELETE - value section must be empty
//! - 0x04: PING   - key and value sections must be empty
//!
//! ## Response Frame
//! ```text
//! ┌────────────┬────────────────┬─────────┐
//! │ Status (1) │ PayloadLen (2) │ Payload │
//! └────────────┴────────────────┴─────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR

mod command;
mod response;
pub mod codec;

pub use codec::{
    encode_command, encode_response, read_command, read_response, write_command, write_response,
};
pub use command::{Command, CommandKind};
pub use response::{Response, Status};
