//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────┐
//! │  Len (4, BE) │        UTF-8 JSON body (Len bytes)   │
//! └──────────────┴──────────────────────────────────────┘
//! ```
//!
//! Requests and responses are framed the same way, so a command never has to
//! fit into a single socket read.

use std::io::{self, ErrorKind, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

use crate::error::{BridgeError, Result};
use super::{Command, CommandType, DecodeError, Response};

/// Length prefix: 4 bytes, unsigned, big-endian
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum frame body size (1 MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

/// Prefix a body with its length
pub fn encode_frame(body: &[u8]) -> Result<Bytes> {
    if body.len() > MAX_FRAME_SIZE {
        return Err(BridgeError::Protocol(format!(
            "Frame too large: {} bytes (max {})",
            body.len(),
            MAX_FRAME_SIZE
        )));
    }

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    frame.put_u32(body.len() as u32);
    frame.put_slice(body);
    Ok(frame.freeze())
}

/// Read one frame body from a stream
///
/// Blocks until the whole body arrived; partial reads are accumulated.
/// A stream that ends early yields an `UnexpectedEof` I/O error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let got = read_full(reader, &mut prefix)?;
    if got < LENGTH_PREFIX_SIZE {
        return Err(closed(format!(
            "connection closed while receiving length prefix ({} of {} bytes)",
            got, LENGTH_PREFIX_SIZE
        )));
    }

    let body_len = u32::from_be_bytes(prefix) as usize;
    if body_len > MAX_FRAME_SIZE {
        return Err(BridgeError::Protocol(format!(
            "Frame too large: {} bytes (max {})",
            body_len, MAX_FRAME_SIZE
        )));
    }

    let mut body = vec![0u8; body_len];
    let got = read_full(reader, &mut body)?;
    if got < body_len {
        return Err(closed(format!(
            "connection closed while receiving frame body ({} of {} bytes)",
            got, body_len
        )));
    }

    tracing::trace!("Read frame of {} bytes", body_len);
    Ok(body)
}

/// Write one frame to a stream and flush it
pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> Result<()> {
    let frame = encode_frame(body)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    tracing::trace!("Wrote frame of {} bytes", body.len());
    Ok(())
}

/// Fill `buf` as far as the stream allows; returns the byte count
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn closed(message: String) -> BridgeError {
    BridgeError::Io(io::Error::new(ErrorKind::UnexpectedEof, message))
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command as a JSON body
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    serde_json::to_vec(command)
        .map_err(|e| BridgeError::Protocol(format!("Cannot encode command: {}", e)))
}

/// Decode a JSON body into a command
///
/// Malformed JSON, unknown `type` values and schema violations are reported
/// separately so the server can answer each with its own message.
pub fn decode_command(body: &[u8]) -> std::result::Result<Command, DecodeError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| DecodeError::InvalidJson)?;

    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::Invalid("command must be a JSON object".to_string()))?;

    let type_name = match object.get("type") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => return Err(DecodeError::UnknownType(other.to_string())),
        None => return Err(DecodeError::UnknownType("<missing>".to_string())),
    };

    let command_type = match CommandType::from_name(&type_name) {
        Some(command_type) => command_type,
        None => return Err(DecodeError::UnknownType(type_name)),
    };

    // Fieldless variants are not covered by deny_unknown_fields
    if matches!(command_type, CommandType::Scan | CommandType::ResetInterface) {
        if let Some(extra) = object.keys().find(|key| key.as_str() != "type") {
            return Err(DecodeError::Invalid(format!(
                "unknown field `{}`, {} takes no fields",
                extra, type_name
            )));
        }
    }

    serde_json::from_value(value).map_err(|e| DecodeError::Invalid(e.to_string()))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response as a JSON body
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    serde_json::to_vec(response)
        .map_err(|e| BridgeError::Protocol(format!("Cannot encode response: {}", e)))
}

/// Decode a JSON body into a response
pub fn decode_response(body: &[u8]) -> Result<Response> {
    serde_json::from_slice(body)
        .map_err(|e| BridgeError::Protocol(format!("Invalid response body: {}", e)))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let body = read_frame(reader)?;
    decode_command(&body).map_err(|e| BridgeError::Protocol(e.to_string()))
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let body = encode_command(command)?;
    write_frame(writer, &body)
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let body = read_frame(reader)?;
    decode_response(&body)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let body = encode_response(response)?;
    write_frame(writer, &body)
}
