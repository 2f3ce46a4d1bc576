//! Command definitions
//!
//! Represents commands from clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest 7-bit bus address
pub const MAX_ADDRESS: u8 = 0x7F;

/// SMBus block transfers carry at most 32 bytes
pub const MAX_BLOCK_LEN: usize = 32;

/// Command types, named as they appear in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    WriteByte,
    ReadByte,
    WriteByteData,
    ReadByteData,
    WriteWordData,
    ReadWordData,
    WriteI2cBlockData,
    ReadI2cBlockData,
    Scan,
    ResetInterface,
}

impl CommandType {
    pub const ALL: [CommandType; 10] = [
        CommandType::WriteByte,
        CommandType::ReadByte,
        CommandType::WriteByteData,
        CommandType::ReadByteData,
        CommandType::WriteWordData,
        CommandType::ReadWordData,
        CommandType::WriteI2cBlockData,
        CommandType::ReadI2cBlockData,
        CommandType::Scan,
        CommandType::ResetInterface,
    ];

    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::WriteByte => "write_byte",
            CommandType::ReadByte => "read_byte",
            CommandType::WriteByteData => "write_byte_data",
            CommandType::ReadByteData => "read_byte_data",
            CommandType::WriteWordData => "write_word_data",
            CommandType::ReadWordData => "read_word_data",
            CommandType::WriteI2cBlockData => "write_i2c_block_data",
            CommandType::ReadI2cBlockData => "read_i2c_block_data",
            CommandType::Scan => "scan",
            CommandType::ResetInterface => "reset_interface",
        }
    }

    /// Look up a command type by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

/// A parsed command
///
/// Decoding rejects missing and extra fields per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Command {
    /// Send a single byte (no register)
    WriteByte { address: u8, value: u8 },

    /// Receive a single byte (no register)
    ReadByte { address: u8 },

    WriteByteData { address: u8, register: u8, value: u8 },

    ReadByteData { address: u8, register: u8 },

    WriteWordData { address: u8, register: u8, value: u16 },

    ReadWordData { address: u8, register: u8 },

    #[serde(rename = "write_i2c_block_data")]
    WriteI2cBlockData { address: u8, register: u8, data: Vec<u8> },

    #[serde(rename = "read_i2c_block_data")]
    ReadI2cBlockData { address: u8, register: u8, length: u8 },

    /// Probe 0x03..=0x77 for responding devices
    Scan,

    /// Close and reopen the server's bus handle
    ResetInterface,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::WriteByte { .. } => CommandType::WriteByte,
            Command::ReadByte { .. } => CommandType::ReadByte,
            Command::WriteByteData { .. } => CommandType::WriteByteData,
            Command::ReadByteData { .. } => CommandType::ReadByteData,
            Command::WriteWordData { .. } => CommandType::WriteWordData,
            Command::ReadWordData { .. } => CommandType::ReadWordData,
            Command::WriteI2cBlockData { .. } => CommandType::WriteI2cBlockData,
            Command::ReadI2cBlockData { .. } => CommandType::ReadI2cBlockData,
            Command::Scan => CommandType::Scan,
            Command::ResetInterface => CommandType::ResetInterface,
        }
    }

    /// Target address, for commands that have one
    pub fn address(&self) -> Option<u8> {
        match self {
            Command::WriteByte { address, .. }
            | Command::ReadByte { address }
            | Command::WriteByteData { address, .. }
            | Command::ReadByteData { address, .. }
            | Command::WriteWordData { address, .. }
            | Command::ReadWordData { address, .. }
            | Command::WriteI2cBlockData { address, .. }
            | Command::ReadI2cBlockData { address, .. } => Some(*address),
            Command::Scan | Command::ResetInterface => None,
        }
    }

    /// Check value ranges the type system does not cover
    pub fn validate(&self) -> Result<(), String> {
        if let Some(address) = self.address() {
            if address > MAX_ADDRESS {
                return Err(format!(
                    "address 0x{:02x} is outside the 7-bit range",
                    address
                ));
            }
        }

        match self {
            Command::WriteI2cBlockData { data, .. } if data.len() > MAX_BLOCK_LEN => Err(format!(
                "block of {} bytes exceeds the {} byte maximum",
                data.len(),
                MAX_BLOCK_LEN
            )),
            Command::ReadI2cBlockData { length, .. } if *length as usize > MAX_BLOCK_LEN => {
                Err(format!(
                    "read length {} exceeds the {} byte maximum",
                    length, MAX_BLOCK_LEN
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Why a command body could not be turned into a [`Command`]
///
/// The display strings are sent back to clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Unknown command type: {0}")]
    UnknownType(String),

    #[error("Invalid command: {0}")]
    Invalid(String),
}
