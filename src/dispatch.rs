//! Dispatch Module
//!
//! Turns decoded commands into bus transactions and responses.
//!
//! ## Responsibilities
//! - Route each command variant to the matching driver call
//! - Scan the bus for responding devices
//! - Reset the bus handle on request
//! - Convert every fault into an error response, so one bad command never
//!   ends the client's session

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::bus::{BusDriver, DriverResult, SharedBus};
use crate::protocol::{decode_command, Command, Response};

/// First address probed by a scan
pub const SCAN_FIRST: u8 = 0x03;

/// Last address probed by a scan (0x78..=0x7F are reserved)
pub const SCAN_LAST: u8 = 0x77;

/// Executes commands against the shared bus
///
/// Cheap to clone; every worker thread holds one.
#[derive(Clone)]
pub struct Dispatcher {
    bus: Arc<SharedBus>,
}

impl Dispatcher {
    pub fn new(bus: Arc<SharedBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<SharedBus> {
        &self.bus
    }

    /// Decode a raw command body and execute it
    ///
    /// Bodies that are not JSON, name an unknown command type, or violate the
    /// command schema get an error response.
    pub fn handle_frame(&self, body: &[u8]) -> Response {
        match decode_command(body) {
            Ok(command) => self.execute(command),
            Err(e) => {
                tracing::warn!("Rejected command: {}", e);
                Response::error(e.to_string())
            }
        }
    }

    /// Execute a command and return a response
    pub fn execute(&self, command: Command) -> Response {
        tracing::debug!("Received command: {:?}", command);

        if let Err(reason) = command.validate() {
            return Response::error(format!("Invalid command: {}", reason));
        }

        let description = format!("{:?}", command);
        match panic::catch_unwind(AssertUnwindSafe(|| self.route(command))) {
            Ok(response) => response,
            Err(_) => {
                tracing::error!("Bus driver panicked while processing {}", description);
                Response::error(format!("Internal error while processing {}", description))
            }
        }
    }

    fn route(&self, command: Command) -> Response {
        match command {
            Command::WriteByte { address, value } => self.transact(|bus| {
                bus.write_byte(address, value)?;
                Ok(Response::success())
            }),
            Command::ReadByte { address } => {
                self.transact(|bus| Ok(Response::with_value(bus.read_byte(address)?.into())))
            }
            Command::WriteByteData { address, register, value } => self.transact(|bus| {
                bus.write_byte_data(address, register, value)?;
                Ok(Response::success())
            }),
            Command::ReadByteData { address, register } => self.transact(|bus| {
                Ok(Response::with_value(bus.read_byte_data(address, register)?.into()))
            }),
            Command::WriteWordData { address, register, value } => self.transact(|bus| {
                bus.write_word_data(address, register, value)?;
                Ok(Response::success())
            }),
            Command::ReadWordData { address, register } => self.transact(|bus| {
                Ok(Response::with_value(bus.read_word_data(address, register)?))
            }),
            Command::WriteI2cBlockData { address, register, data } => self.transact(|bus| {
                bus.write_block_data(address, register, &data)?;
                Ok(Response::success())
            }),
            Command::ReadI2cBlockData { address, register, length } => self.transact(|bus| {
                let data = bus.read_block_data(address, register, length as usize)?;
                Ok(Response::with_data(data))
            }),
            Command::Scan => self.transact(|bus| Ok(Response::with_devices(scan_bus(bus)))),
            Command::ResetInterface => self.reset_interface(),
        }
    }

    /// Run `f` under the bus lock; faults become error responses
    fn transact<F>(&self, f: F) -> Response
    where
        F: FnOnce(&mut dyn BusDriver) -> DriverResult<Response>,
    {
        self.bus.with_driver(f).unwrap_or_else(|fault| {
            tracing::warn!("Bus transaction failed: {}", fault);
            Response::error(fault.to_string())
        })
    }

    fn reset_interface(&self) -> Response {
        tracing::info!("Resetting I2C interface...");
        match self.bus.reset() {
            Ok(()) => {
                tracing::info!("I2C interface reset successful");
                Response::with_message("I2C interface reset")
            }
            Err(fault) => {
                tracing::error!("Failed to reset I2C interface: {}", fault);
                Response::error(format!("Reset failed: {}", fault))
            }
        }
    }
}

/// Probe every address from `SCAN_FIRST` to `SCAN_LAST` with a one-byte read
///
/// A failed read means no device at that address; it is skipped and the
/// scan carries on. The result is ascending.
pub fn scan_bus(bus: &mut dyn BusDriver) -> Vec<u8> {
    (SCAN_FIRST..=SCAN_LAST)
        .filter(|&address| bus.read_byte(address).is_ok())
        .collect()
}
