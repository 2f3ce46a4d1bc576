//! Bus Module
//!
//! The server's side of the physical bus.
//!
//! ## Responsibilities
//! - Define the driver capability the server dispatches to ([`BusDriver`])
//! - Open and reopen drivers by bus number ([`BusOpener`])
//! - Own the one process-wide driver handle and serialize every transaction
//!   on it ([`SharedBus`])
//! - Provide an in-memory bus for running without hardware ([`SimulatedBus`])
//!
//! ## Locking
//! ```text
//!   worker 1 ──┐
//!   worker 2 ──┼──► SharedBus::with_driver ──► Mutex<Option<Box<dyn BusDriver>>>
//!   worker N ──┘         (try_lock_for)              │
//!                                                    ▼
//!                                         one transaction at a time
//! ```

mod shared;
mod simulated;

use std::time::Duration;

use thiserror::Error;

pub use shared::SharedBus;
pub use simulated::SimulatedBus;

/// Result of a single driver call
pub type DriverResult<T> = std::result::Result<T, DriverFault>;

/// A rejected bus transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverFault {
    /// Nothing acknowledged the address
    #[error("no acknowledgment from device at address 0x{address:02x}")]
    NoAck { address: u8 },

    /// The handle was closed, or the last reset failed to reopen it
    #[error("bus is not open")]
    NotOpen,

    #[error("timed out after {0:?} waiting for exclusive bus access")]
    Busy(Duration),

    #[error("cannot open bus {bus}: {reason}")]
    Open { bus: u32, reason: String },

    #[error("bus I/O failure: {0}")]
    Io(String),
}

/// An open handle on one physical bus
///
/// Implementations perform the actual hardware transaction and fail with a
/// [`DriverFault`] when no device acknowledges. Addresses are 7-bit.
pub trait BusDriver: Send {
    /// Send one byte without a register
    fn write_byte(&mut self, address: u8, value: u8) -> DriverResult<()>;

    /// Receive one byte without a register
    fn read_byte(&mut self, address: u8) -> DriverResult<u8>;

    fn write_byte_data(&mut self, address: u8, register: u8, value: u8) -> DriverResult<()>;

    fn read_byte_data(&mut self, address: u8, register: u8) -> DriverResult<u8>;

    fn write_word_data(&mut self, address: u8, register: u8, value: u16) -> DriverResult<()>;

    fn read_word_data(&mut self, address: u8, register: u8) -> DriverResult<u16>;

    fn write_block_data(&mut self, address: u8, register: u8, data: &[u8]) -> DriverResult<()>;

    fn read_block_data(&mut self, address: u8, register: u8, length: usize) -> DriverResult<Vec<u8>>;

    /// Release the underlying device; called before a reopen and at shutdown
    fn close(&mut self) {}
}

/// Opens drivers by bus number
pub trait BusOpener: Send + Sync {
    fn open(&self, bus_number: u32) -> DriverResult<Box<dyn BusDriver>>;
}
