//! smbus2-style facade
//!
//! Lets code written against a local `SMBus(bus)` object run against a
//! remote bus with only the constructor changed.

use crate::error::Result;

use super::{Client, I2cBus};

/// SMBus-compatible wrapper around any [`I2cBus`]
///
/// The bus number is kept for callers that inspect it; the remote server
/// decides which physical bus is used. The connection is closed on drop.
pub struct SmBus<B: I2cBus = Client> {
    bus_number: u32,
    inner: B,
}

impl SmBus<Client> {
    /// Open a remote bus (`bus` is ignored for remote access)
    pub fn new(bus: u32, host: impl Into<String>, port: u16) -> Self {
        Self::wrap(bus, Client::with_addr(host, port))
    }
}

impl<B: I2cBus> SmBus<B> {
    pub fn wrap(bus_number: u32, inner: B) -> Self {
        Self { bus_number, inner }
    }

    pub fn bus_number(&self) -> u32 {
        self.bus_number
    }

    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.inner
    }

    // -------------------------------------------------------------------------
    // smbus2 names, argument order (i2c_addr, register, value)
    // -------------------------------------------------------------------------

    pub fn read_byte(&mut self, i2c_addr: u8) -> Result<u8> {
        self.inner.read_byte(i2c_addr)
    }

    pub fn write_byte(&mut self, i2c_addr: u8, value: u8) -> Result<()> {
        self.inner.write_byte(i2c_addr, value)
    }

    pub fn read_byte_data(&mut self, i2c_addr: u8, register: u8) -> Result<u8> {
        self.inner.read_byte_data(i2c_addr, register)
    }

    pub fn write_byte_data(&mut self, i2c_addr: u8, register: u8, value: u8) -> Result<()> {
        self.inner.write_byte_data(i2c_addr, register, value)
    }

    pub fn read_word_data(&mut self, i2c_addr: u8, register: u8) -> Result<u16> {
        self.inner.read_word_data(i2c_addr, register)
    }

    pub fn write_word_data(&mut self, i2c_addr: u8, register: u8, value: u16) -> Result<()> {
        self.inner.write_word_data(i2c_addr, register, value)
    }

    pub fn read_i2c_block_data(&mut self, i2c_addr: u8, register: u8, length: u8) -> Result<Vec<u8>> {
        self.inner.read_i2c_block_data(i2c_addr, register, length)
    }

    pub fn write_i2c_block_data(&mut self, i2c_addr: u8, register: u8, data: &[u8]) -> Result<()> {
        self.inner.write_i2c_block_data(i2c_addr, register, data)
    }

    pub fn scan(&mut self) -> Result<Vec<u8>> {
        self.inner.scan()
    }

    /// Ask the server to close and reopen its bus handle
    pub fn reset_interface(&mut self) -> Result<String> {
        self.inner.reset_interface()
    }

    pub fn close(&mut self) {
        self.inner.close();
    }
}

impl<B: I2cBus> Drop for SmBus<B> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
