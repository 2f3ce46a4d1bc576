//! Shared test fixtures: fake bus drivers and loopback servers.

#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use i2c_bridge::bus::{BusDriver, BusOpener, DriverFault, DriverResult, SharedBus};
use i2c_bridge::network::{Server, ShutdownHandle};
use i2c_bridge::{Client, ClientConfig, ServerConfig};
use parking_lot::Mutex;

// =============================================================================
// Fake Driver
// =============================================================================

/// A write the fake driver received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Byte { address: u8, value: u8 },
    ByteData { address: u8, register: u8, value: u8 },
    WordData { address: u8, register: u8, value: u16 },
    Block { address: u8, register: u8, data: Vec<u8> },
}

/// Observations shared by every clone of a fake driver
#[derive(Debug, Clone, Default)]
pub struct FakeState {
    in_transaction: Arc<AtomicBool>,
    pub overlaps: Arc<AtomicUsize>,
    pub transactions: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub writes: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeState {
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Recorded> {
        self.writes.lock().clone()
    }
}

/// Driver that acknowledges a fixed set of addresses and returns canned values
///
/// Counts any transaction that starts while another is still running.
#[derive(Debug, Clone)]
pub struct FakeDriver {
    present: Vec<u8>,
    pub byte_value: u8,
    pub word_value: u16,
    pub block: Vec<u8>,
    latency: Duration,
    panic_on: Option<u8>,
    pub state: FakeState,
}

impl FakeDriver {
    pub fn new(present: &[u8]) -> Self {
        Self {
            present: present.to_vec(),
            byte_value: 0x42,
            word_value: 0xBEEF,
            block: (0..32).collect(),
            latency: Duration::ZERO,
            panic_on: None,
            state: FakeState::default(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Panic on any transaction with this address
    pub fn panicking_on(mut self, address: u8) -> Self {
        self.panic_on = Some(address);
        self
    }

    fn transaction<T>(&self, address: u8, f: impl FnOnce() -> T) -> DriverResult<T> {
        if self.state.in_transaction.swap(true, Ordering::SeqCst) {
            self.state.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.state.transactions.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let result = if self.panic_on == Some(address) {
            self.state.in_transaction.store(false, Ordering::SeqCst);
            panic!("fake driver exploded at 0x{:02x}", address);
        } else if self.present.contains(&address) {
            Ok(f())
        } else {
            Err(DriverFault::NoAck { address })
        };

        self.state.in_transaction.store(false, Ordering::SeqCst);
        result
    }

    fn record(&self, write: Recorded) {
        self.state.writes.lock().push(write);
    }
}

impl BusDriver for FakeDriver {
    fn write_byte(&mut self, address: u8, value: u8) -> DriverResult<()> {
        self.transaction(address, || self.record(Recorded::Byte { address, value }))
    }

    fn read_byte(&mut self, address: u8) -> DriverResult<u8> {
        self.transaction(address, || self.byte_value)
    }

    fn write_byte_data(&mut self, address: u8, register: u8, value: u8) -> DriverResult<()> {
        self.transaction(address, || {
            self.record(Recorded::ByteData { address, register, value })
        })
    }

    fn read_byte_data(&mut self, address: u8, _register: u8) -> DriverResult<u8> {
        self.transaction(address, || self.byte_value)
    }

    fn write_word_data(&mut self, address: u8, register: u8, value: u16) -> DriverResult<()> {
        self.transaction(address, || {
            self.record(Recorded::WordData { address, register, value })
        })
    }

    fn read_word_data(&mut self, address: u8, _register: u8) -> DriverResult<u16> {
        self.transaction(address, || self.word_value)
    }

    fn write_block_data(&mut self, address: u8, register: u8, data: &[u8]) -> DriverResult<()> {
        self.transaction(address, || {
            self.record(Recorded::Block {
                address,
                register,
                data: data.to_vec(),
            })
        })
    }

    fn read_block_data(&mut self, address: u8, _register: u8, length: usize) -> DriverResult<Vec<u8>> {
        self.transaction(address, || self.block.iter().copied().take(length).collect())
    }

    fn close(&mut self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Fake Opener
// =============================================================================

/// Hands out clones of a template driver; can be told to fail upcoming opens
#[derive(Clone)]
pub struct FakeOpener {
    template: FakeDriver,
    failures_left: Arc<AtomicUsize>,
    pub opens: Arc<AtomicUsize>,
}

impl FakeOpener {
    pub fn new(template: FakeDriver) -> Self {
        Self {
            template,
            failures_left: Arc::new(AtomicUsize::new(0)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the next `count` opens fail
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> FakeState {
        self.template.state.clone()
    }
}

impl BusOpener for FakeOpener {
    fn open(&self, bus_number: u32) -> DriverResult<Box<dyn BusDriver>> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DriverFault::Open {
                bus: bus_number,
                reason: "No such device".to_string(),
            });
        }

        Ok(Box::new(self.template.clone()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a shared bus backed by `opener`
pub fn shared_bus<O: BusOpener + 'static>(opener: O) -> Arc<SharedBus> {
    Arc::new(SharedBus::open(opener, 1, LOCK_TIMEOUT).unwrap())
}

/// Start a server on an ephemeral loopback port
pub fn start_server(bus: Arc<SharedBus>) -> (SocketAddr, ShutdownHandle) {
    let config = ServerConfig::builder()
        .listen_addr("127.0.0.1:0")
        .workers(4)
        .read_timeout_ms(5000)
        .accept_poll_ms(5)
        .build();
    let server = Server::bind(config, bus).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();

    thread::spawn(move || {
        server.run().unwrap();
    });

    (addr, handle)
}

pub fn client_for(addr: SocketAddr) -> Client {
    Client::new(
        ClientConfig::builder()
            .host("127.0.0.1")
            .port(addr.port())
            .timeout_ms(2000)
            .build(),
    )
}

/// Run `handler` on a raw listener in a background thread
pub fn stub_server<F>(handler: F) -> SocketAddr
where
    F: FnOnce(TcpListener) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || handler(listener));
    addr
}
