//! Simulated bus
//!
//! In-memory register-file devices, for running the server without hardware.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::{BusDriver, BusOpener, DriverFault, DriverResult};

/// Registers per simulated device
const REGISTER_COUNT: usize = 256;

/// One simulated device: 256 byte registers and a register pointer
#[derive(Debug, Clone)]
struct SimulatedDevice {
    registers: [u8; REGISTER_COUNT],

    /// Set by `write_byte`, advanced by `read_byte`
    pointer: u8,
}

impl SimulatedDevice {
    fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            pointer: 0,
        }
    }

    fn get(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    fn set(&mut self, register: u8, value: u8) {
        self.registers[register as usize] = value;
    }
}

/// A bus whose devices live in memory
///
/// Clones share device state, so register contents survive a reset just as
/// they would on real hardware. Words are little-endian (SMBus order); block
/// transfers wrap around at register 0xFF.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    devices: Arc<Mutex<BTreeMap<u8, SimulatedDevice>>>,

    /// Delay added to every transaction
    latency: Duration,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device at `address`
    pub fn with_device(self, address: u8) -> Self {
        self.devices
            .lock()
            .entry(address)
            .or_insert_with(SimulatedDevice::new);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Addresses with an attached device, ascending
    pub fn addresses(&self) -> Vec<u8> {
        self.devices.lock().keys().copied().collect()
    }

    /// Inspect a register without going through the bus
    pub fn register(&self, address: u8, register: u8) -> Option<u8> {
        self.devices.lock().get(&address).map(|d| d.get(register))
    }

    /// Preload a register without going through the bus
    pub fn set_register(&self, address: u8, register: u8, value: u8) -> DriverResult<()> {
        self.transact(address, |device| {
            device.set(register, value);
            Ok(())
        })
    }

    /// Run `f` against the device at `address`, or fail with `NoAck`
    fn transact<T>(
        &self,
        address: u8,
        f: impl FnOnce(&mut SimulatedDevice) -> DriverResult<T>,
    ) -> DriverResult<T> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let mut devices = self.devices.lock();
        let device = devices
            .get_mut(&address)
            .ok_or(DriverFault::NoAck { address })?;
        f(device)
    }
}

impl BusDriver for SimulatedBus {
    fn write_byte(&mut self, address: u8, value: u8) -> DriverResult<()> {
        self.transact(address, |device| {
            device.pointer = value;
            Ok(())
        })
    }

    fn read_byte(&mut self, address: u8) -> DriverResult<u8> {
        self.transact(address, |device| {
            let value = device.get(device.pointer);
            device.pointer = device.pointer.wrapping_add(1);
            Ok(value)
        })
    }

    fn write_byte_data(&mut self, address: u8, register: u8, value: u8) -> DriverResult<()> {
        self.transact(address, |device| {
            device.set(register, value);
            Ok(())
        })
    }

    fn read_byte_data(&mut self, address: u8, register: u8) -> DriverResult<u8> {
        self.transact(address, |device| Ok(device.get(register)))
    }

    fn write_word_data(&mut self, address: u8, register: u8, value: u16) -> DriverResult<()> {
        self.transact(address, |device| {
            let [low, high] = value.to_le_bytes();
            device.set(register, low);
            device.set(register.wrapping_add(1), high);
            Ok(())
        })
    }

    fn read_word_data(&mut self, address: u8, register: u8) -> DriverResult<u16> {
        self.transact(address, |device| {
            let low = device.get(register);
            let high = device.get(register.wrapping_add(1));
            Ok(u16::from_le_bytes([low, high]))
        })
    }

    fn write_block_data(&mut self, address: u8, register: u8, data: &[u8]) -> DriverResult<()> {
        self.transact(address, |device| {
            let mut reg = register;
            for &byte in data {
                device.set(reg, byte);
                reg = reg.wrapping_add(1);
            }
            Ok(())
        })
    }

    fn read_block_data(&mut self, address: u8, register: u8, length: usize) -> DriverResult<Vec<u8>> {
        self.transact(address, |device| {
            let mut reg = register;
            let mut data = Vec::with_capacity(length);
            for _ in 0..length {
                data.push(device.get(reg));
                reg = reg.wrapping_add(1);
            }
            Ok(data)
        })
    }
}

impl BusOpener for SimulatedBus {
    fn open(&self, bus_number: u32) -> DriverResult<Box<dyn BusDriver>> {
        tracing::debug!(
            "Opening simulated bus {} with devices {:02x?}",
            bus_number,
            self.addresses()
        );
        Ok(Box::new(self.clone()))
    }
}
