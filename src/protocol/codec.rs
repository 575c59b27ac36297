//! Wire codec
//!
//! Encoding and decoding for the client protocol. Every request and every
//! response is one self-delimiting frame; lengths are 2-byte big-endian, so
//! no frame field can exceed the store's own field cap and no separate
//! size guard is needed.
//!
//! ## Request Frame
//! ```text
//! ┌─────────┬───────────┬─────┬─────────────┬───────┐
//! │ Cmd (1) │ KeyLen(2) │ Key │ ValueLen(2) │ Value │
//! └─────────┴───────────┴─────┴─────────────┴───────┘
//! ```
//! GET and DELETE carry an empty value; PING carries nothing at all. A
//! frame whose empty sections are not empty is malformed.
//!
//! ## Response Frame
//! ```text
//! ┌────────────┬────────────────┬─────────┐
//! │ Status (1) │ PayloadLen (2) │ Payload │
//! └────────────┴────────────────┴─────────┘
//! ```

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{LedgerError, Result};
use crate::wal::MAX_FIELD_LEN;

use super::{Command, CommandKind, Response, Status};

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command into one frame.
pub fn encode_command(command: &Command) -> Result<Bytes> {
    let (key, value): (&[u8], &[u8]) = match command {
        Command::Get { key } => (key, &[]),
        Command::Put { key, value } => (key, value),
        Command::Delete { key } => (key, &[]),
        Command::Ping => (&[], &[]),
    };
    check_wire_len("key", key.len())?;
    check_wire_len("value", value.len())?;

    let mut frame = BytesMut::with_capacity(1 + 2 + key.len() + 2 + value.len());
    frame.put_u8(command.kind() as u8);
    frame.put_u16(key.len() as u16);
    frame.put_slice(key);
    frame.put_u16(value.len() as u16);
    frame.put_slice(value);
    Ok(frame.freeze())
}

/// Read one command frame from a stream.
///
/// Blocks until the frame is complete. A stream that ends mid-frame
/// surfaces as the underlying IO error.
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let mut kind_byte = [0u8; 1];
    reader.read_exact(&mut kind_byte)?;
    let kind = CommandKind::from_byte(kind_byte[0]).ok_or_else(|| {
        LedgerError::Protocol(format!("unknown command byte: 0x{:02x}", kind_byte[0]))
    })?;

    let key = read_field(reader)?;
    let value = read_field(reader)?;

    match kind {
        CommandKind::Get => {
            reject_section(kind, "value", &value)?;
            Ok(Command::Get { key })
        }
        CommandKind::Put => Ok(Command::Put { key, value }),
        CommandKind::Delete => {
            reject_section(kind, "value", &value)?;
            Ok(Command::Delete { key })
        }
        CommandKind::Ping => {
            reject_section(kind, "key", &key)?;
            reject_section(kind, "value", &value)?;
            Ok(Command::Ping)
        }
    }
}

/// Write a command to a stream and flush it.
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let frame = encode_command(command)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response into one frame.
pub fn encode_response(response: &Response) -> Result<Bytes> {
    let payload: &[u8] = response.payload.as_deref().unwrap_or(&[]);
    check_wire_len("payload", payload.len())?;

    let mut frame = BytesMut::with_capacity(1 + 2 + payload.len());
    frame.put_u8(response.status as u8);
    frame.put_u16(payload.len() as u16);
    frame.put_slice(payload);
    Ok(frame.freeze())
}

/// Read one response frame from a stream.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut status_byte = [0u8; 1];
    reader.read_exact(&mut status_byte)?;
    let status = Status::from_byte(status_byte[0]).ok_or_else(|| {
        LedgerError::Protocol(format!("unknown status byte: 0x{:02x}", status_byte[0]))
    })?;

    let payload = read_field(reader)?;
    Ok(Response {
        status,
        payload: if payload.is_empty() { None } else { Some(payload) },
    })
}

/// Write a response to a stream and flush it.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let frame = encode_response(response)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Frame helpers
// =============================================================================

/// Read one length-prefixed section.
fn read_field<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    reader.read_exact(&mut len_buf)?;
    let len = u16::from_be_bytes(len_buf) as usize;

    let mut field = vec![0u8; len];
    if len > 0 {
        reader.read_exact(&mut field)?;
    }
    Ok(field)
}

fn check_wire_len(section: &'static str, len: usize) -> Result<()> {
    if len > MAX_FIELD_LEN {
        return Err(LedgerError::FieldTooLong {
            field: section,
            len,
            max: MAX_FIELD_LEN,
        });
    }
    Ok(())
}

fn reject_section(kind: CommandKind, section: &'static str, bytes: &[u8]) -> Result<()> {
    if !bytes.is_empty() {
        return Err(LedgerError::Protocol(format!(
            "{kind:?} carries a {section} of {} bytes; none is allowed",
            bytes.len()
        )));
    }
    Ok(())
}
