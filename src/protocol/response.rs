//! Response definitions
//!
//! What the server sends back for each command.

/// Response status bytes, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

impl Status {
    /// Decode a status byte from the wire.
    pub fn from_byte(byte: u8) -> Option<Status> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NotFound),
            0x02 => Some(Status::Error),
            _ => None,
        }
    }
}

/// A response to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,

    /// The fetched value on a successful GET, the message on an error,
    /// absent otherwise.
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// A success, with the payload if the command produced one.
    pub fn ok(payload: Option<Vec<u8>>) -> Response {
        Response {
            status: Status::Ok,
            payload,
        }
    }

    /// The key does not exist.
    pub fn not_found() -> Response {
        Response {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// The command failed; the message rides along as the payload.
    pub fn error(message: &str) -> Response {
        Response {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }
}
