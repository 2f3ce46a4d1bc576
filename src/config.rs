//! Configuration for i2c-bridge
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::BridgeError;
use crate::protocol::MAX_ADDRESS;

/// Default TCP port for the bridge protocol
pub const DEFAULT_PORT: u16 = 8888;

/// Server-side configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (host:port)
    pub listen_addr: String,

    /// Number of worker threads serving client connections
    pub workers: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// How long the acceptor sleeps when no connection is pending (milliseconds)
    pub accept_poll_ms: u64,

    // -------------------------------------------------------------------------
    // Bus Configuration
    // -------------------------------------------------------------------------
    /// Bus number handed to the driver on open and on every reset
    pub bus_number: u32,

    /// Maximum wait for exclusive bus access (milliseconds)
    pub bus_lock_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            workers: 4,
            read_timeout_ms: 60_000,
            write_timeout_ms: 5000,
            accept_poll_ms: 50,
            bus_number: 1,
            bus_lock_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    pub fn bus_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.bus_lock_timeout_ms)
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads (at least one)
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count.max(1);
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn accept_poll_ms(mut self, ms: u64) -> Self {
        self.config.accept_poll_ms = ms;
        self
    }

    /// Set the bus number opened at startup
    pub fn bus_number(mut self, bus: u32) -> Self {
        self.config.bus_number = bus;
        self
    }

    /// Set the bus lock timeout (in milliseconds)
    pub fn bus_lock_timeout_ms(mut self, ms: u64) -> Self {
        self.config.bus_lock_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Client-side configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or IP
    pub host: String,

    /// Server port
    pub port: u16,

    /// Bound on connect, send and receive (milliseconds)
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// `host:port` as used for connecting and in error messages
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the socket timeout (in milliseconds); zero is bumped to one
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms.max(1);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// =============================================================================
// Argument parsing helpers
// =============================================================================

/// Parse a decimal or `0x`-prefixed hexadecimal number
fn parse_number(text: &str) -> Result<u64, BridgeError> {
    let trimmed = text.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|e| BridgeError::Config(format!("'{}' is not a number: {}", text, e)))
}

/// Parse a 7-bit bus address
pub fn parse_address(text: &str) -> Result<u8, BridgeError> {
    match parse_number(text)? {
        n if n <= u64::from(MAX_ADDRESS) => Ok(n as u8),
        n => Err(BridgeError::Config(format!(
            "address 0x{:x} is outside the 7-bit range",
            n
        ))),
    }
}

/// Parse a byte (register number or byte value)
pub fn parse_byte(text: &str) -> Result<u8, BridgeError> {
    let n = parse_number(text)?;
    u8::try_from(n).map_err(|_| BridgeError::Config(format!("{} does not fit in a byte", n)))
}

/// Parse a 16-bit word value
pub fn parse_word(text: &str) -> Result<u16, BridgeError> {
    let n = parse_number(text)?;
    u16::try_from(n).map_err(|_| BridgeError::Config(format!("{} does not fit in a word", n)))
}
