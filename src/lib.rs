//! # i2c-bridge
//!
//! Remote access to an I2C bus over TCP:
//! - A server that owns the physical bus and serves bus transactions
//! - A client that lazily connects, and reconnects after any failure
//! - A length-prefixed JSON protocol shared by both sides
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐                ┌──────────────────────────────┐
//! │        Client        │   TCP stream   │          TCP Server          │
//! │  (one socket, lazy   │◄──────────────►│   acceptor + worker threads  │
//! │   reconnect)         │  [len][json]   └──────────────┬───────────────┘
//! └──────────────────────┘                               │
//!                                          ┌─────────────▼───────────────┐
//!                                          │         Dispatcher          │
//!                                          │  (command → bus → response) │
//!                                          └─────────────┬───────────────┘
//!                                                        │
//!                                          ┌─────────────▼───────────────┐
//!                                          │          SharedBus          │
//!                                          │   (one lock, one driver)    │
//!                                          └─────────────┬───────────────┘
//!                                                        │
//!                                          ┌─────────────▼───────────────┐
//!                                          │         BusDriver           │
//!                                          │   (hardware or simulated)   │
//!                                          └─────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod bus;
pub mod dispatch;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BridgeError, Result};
pub use config::{ClientConfig, ServerConfig};
pub use bus::{BusDriver, BusOpener, DriverFault, SharedBus};
pub use dispatch::Dispatcher;
pub use client::{Client, I2cBus, SmBus};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of i2c-bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
