//! Command definitions
//!
//! The requests a client can make of the store.

/// Command kind bytes, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    Ping = 0x04,
}

impl CommandKind {
    /// Decode a kind byte from the wire.
    pub fn from_byte(byte: u8) -> Option<CommandKind> {
        match byte {
            0x01 => Some(CommandKind::Get),
            0x02 => Some(CommandKind::Put),
            0x03 => Some(CommandKind::Delete),
            0x04 => Some(CommandKind::Ping),
            _ => None,
        }
    }
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch the value stored under a key
    Get { key: Vec<u8> },

    /// Insert or overwrite a key
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Remove a key
    Delete { key: Vec<u8> },

    /// Health check
    Ping,
}

impl Command {
    /// The wire kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Get { .. } => CommandKind::Get,
            Command::Put { .. } => CommandKind::Put,
            Command::Delete { .. } => CommandKind::Delete,
            Command::Ping => CommandKind::Ping,
        }
    }
}
