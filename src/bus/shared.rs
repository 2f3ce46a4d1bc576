//! Shared bus handle
//!
//! Process-wide driver handle with an explicit lifecycle.

use std::time::Duration;

use parking_lot::Mutex;

use super::{BusDriver, BusOpener, DriverFault, DriverResult};

/// The server's single bus handle
///
/// ## Lifecycle
/// - `open`: once, at startup
/// - `reset`: close + reopen against the same bus number
/// - `close`: at shutdown
///
/// ## Concurrency
/// - `driver`: one `Mutex` shared by dispatch and reset, so a reset never
///   overlaps a transaction
/// - Waiting for the lock is bounded by `lock_timeout`
pub struct SharedBus {
    /// Creates drivers on open and reset
    opener: Box<dyn BusOpener>,

    bus_number: u32,

    lock_timeout: Duration,

    /// `None` after close, or after a reset that failed to reopen
    driver: Mutex<Option<Box<dyn BusDriver>>>,
}

impl SharedBus {
    /// Open the bus
    pub fn open<O>(opener: O, bus_number: u32, lock_timeout: Duration) -> DriverResult<Self>
    where
        O: BusOpener + 'static,
    {
        let driver = opener.open(bus_number)?;
        tracing::info!("I2C bus {} initialized successfully", bus_number);

        Ok(Self {
            opener: Box::new(opener),
            bus_number,
            lock_timeout,
            driver: Mutex::new(Some(driver)),
        })
    }

    /// Run `f` with exclusive access to the driver
    ///
    /// Everything `f` does is one uninterrupted sequence on the bus.
    pub fn with_driver<T, F>(&self, f: F) -> DriverResult<T>
    where
        F: FnOnce(&mut dyn BusDriver) -> DriverResult<T>,
    {
        let mut guard = self
            .driver
            .try_lock_for(self.lock_timeout)
            .ok_or(DriverFault::Busy(self.lock_timeout))?;

        let driver = guard.as_mut().ok_or(DriverFault::NotOpen)?;
        f(&mut **driver)
    }

    /// Close the current handle (if any) and open a new one
    ///
    /// On failure the handle stays closed until a later reset succeeds.
    pub fn reset(&self) -> DriverResult<()> {
        let mut guard = self
            .driver
            .try_lock_for(self.lock_timeout)
            .ok_or(DriverFault::Busy(self.lock_timeout))?;

        if let Some(mut old) = guard.take() {
            old.close();
        }

        let driver = self.opener.open(self.bus_number)?;
        *guard = Some(driver);
        Ok(())
    }

    /// Close the handle; later transactions fail with `NotOpen`
    pub fn close(&self) {
        let mut guard = self.driver.lock();
        if let Some(mut driver) = guard.take() {
            driver.close();
            tracing::info!("I2C bus {} closed", self.bus_number);
        }
    }

    pub fn is_open(&self) -> bool {
        self.driver.lock().is_some()
    }

    pub fn bus_number(&self) -> u32 {
        self.bus_number
    }
}
