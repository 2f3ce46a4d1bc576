//! Client Module
//!
//! Remote access to the server's bus.
//!
//! ## Responsibilities
//! - Hold at most one connection, opened lazily on the first call
//! - Send one command, wait for its whole response, return typed results
//! - Drop the connection after any transport failure so the next call
//!   starts from a fresh one (the failing call itself is not retried)
//!
//! ## Error mapping
//! - Cannot connect / short read / timeout → [`BridgeError::Connection`]
//! - Undecodable response / missing field  → [`BridgeError::Protocol`]
//! - `status: error` from the server       → [`BridgeError::Remote`]
//!
//! [`BridgeError::Connection`]: crate::BridgeError::Connection
//! [`BridgeError::Protocol`]: crate::BridgeError::Protocol
//! [`BridgeError::Remote`]: crate::BridgeError::Remote

mod remote;
mod smbus;

pub use remote::Client;
pub use smbus::SmBus;

use crate::error::Result;

/// Everything a caller can do with a (remote) bus
pub trait I2cBus {
    /// Send one byte without a register
    fn write_byte(&mut self, address: u8, value: u8) -> Result<()>;

    /// Receive one byte without a register
    fn read_byte(&mut self, address: u8) -> Result<u8>;

    fn write_byte_data(&mut self, address: u8, register: u8, value: u8) -> Result<()>;

    fn read_byte_data(&mut self, address: u8, register: u8) -> Result<u8>;

    fn write_word_data(&mut self, address: u8, register: u8, value: u16) -> Result<()>;

    fn read_word_data(&mut self, address: u8, register: u8) -> Result<u16>;

    /// Write up to 32 bytes starting at `register`
    fn write_i2c_block_data(&mut self, address: u8, register: u8, data: &[u8]) -> Result<()>;

    /// Read up to 32 bytes starting at `register`
    fn read_i2c_block_data(&mut self, address: u8, register: u8, length: u8) -> Result<Vec<u8>>;

    /// Addresses in 0x03..=0x77 that answered, ascending
    fn scan(&mut self) -> Result<Vec<u8>>;

    /// Ask the server to close and reopen its bus; returns its confirmation
    fn reset_interface(&mut self) -> Result<String>;

    fn close(&mut self);
}
