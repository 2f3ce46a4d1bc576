//! TCP client
//!
//! One connection, one outstanding command at a time.

use std::io::{self, ErrorKind};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{read_response, write_command, Command, Response};

use super::I2cBus;

/// Client for a remote I2C server
///
/// Methods take `&mut self`: callers sharing a client across threads
/// serialize through their own lock, which also guarantees no pipelining.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,

    /// `None` until the first call, and after any transport failure
    stream: Option<TcpStream>,
}

impl Client {
    /// Create a client; nothing is connected until the first call
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Create a client for `host:port` with the default timeout
    pub fn with_addr(host: impl Into<String>, port: u16) -> Self {
        Self::new(ClientConfig::builder().host(host).port(port).build())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect now instead of on the first call
    pub fn connect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            self.open_stream()?;
        }
        Ok(())
    }

    /// Send a command and wait for its response
    ///
    /// An error response becomes [`BridgeError::Remote`]. Transport and
    /// decoding failures discard the connection before returning.
    pub fn send_command(&mut self, command: &Command) -> Result<Response> {
        command.validate().map_err(BridgeError::InvalidArgument)?;

        if self.stream.is_none() {
            self.open_stream()?;
        }

        let exchanged = match self.stream.as_mut() {
            Some(stream) => write_command(stream, command).and_then(|()| read_response(stream)),
            None => Err(BridgeError::Connection("not connected".to_string())),
        };

        match exchanged {
            Ok(response) => response.into_result(),
            Err(e) => {
                let e = self.classify(e);
                tracing::error!("Communication error: {}", e);
                // Next call reconnects
                self.close();
                Err(e)
            }
        }
    }

    /// Open a fresh connection, trying every resolved address
    fn open_stream(&mut self) -> Result<()> {
        let target = self.config.server_addr();
        let timeout = self.config.timeout();
        let cannot_connect =
            |reason: String| BridgeError::Connection(format!("Cannot connect to {}: {}", target, reason));

        let addrs = target
            .to_socket_addrs()
            .map_err(|e| cannot_connect(e.to_string()))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    configure(&stream, timeout).map_err(|e| cannot_connect(e.to_string()))?;
                    tracing::debug!("Connected to {}", target);
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no addresses resolved".to_string());
        tracing::error!("Failed to connect to {}: {}", target, reason);
        Err(cannot_connect(reason))
    }

    /// Map a raw exchange failure onto the client's error taxonomy
    fn classify(&self, error: BridgeError) -> BridgeError {
        match error {
            BridgeError::Io(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                BridgeError::Connection(format!(
                    "timed out after {}ms talking to {}",
                    self.config.timeout_ms,
                    self.config.server_addr()
                ))
            }
            BridgeError::Io(e) => BridgeError::Connection(e.to_string()),
            other => other,
        }
    }
}

/// Apply the per-call timeout and disable Nagle on a fresh socket
fn configure(stream: &TcpStream, timeout: Duration) -> io::Result<()> {
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_nodelay(true)
}

impl I2cBus for Client {
    fn write_byte(&mut self, address: u8, value: u8) -> Result<()> {
        self.send_command(&Command::WriteByte { address, value })?;
        Ok(())
    }

    fn read_byte(&mut self, address: u8) -> Result<u8> {
        self.send_command(&Command::ReadByte { address })?.expect_byte()
    }

    fn write_byte_data(&mut self, address: u8, register: u8, value: u8) -> Result<()> {
        self.send_command(&Command::WriteByteData { address, register, value })?;
        Ok(())
    }

    fn read_byte_data(&mut self, address: u8, register: u8) -> Result<u8> {
        self.send_command(&Command::ReadByteData { address, register })?
            .expect_byte()
    }

    fn write_word_data(&mut self, address: u8, register: u8, value: u16) -> Result<()> {
        self.send_command(&Command::WriteWordData { address, register, value })?;
        Ok(())
    }

    fn read_word_data(&mut self, address: u8, register: u8) -> Result<u16> {
        self.send_command(&Command::ReadWordData { address, register })?
            .expect_value()
    }

    fn write_i2c_block_data(&mut self, address: u8, register: u8, data: &[u8]) -> Result<()> {
        self.send_command(&Command::WriteI2cBlockData {
            address,
            register,
            data: data.to_vec(),
        })?;
        Ok(())
    }

    fn read_i2c_block_data(&mut self, address: u8, register: u8, length: u8) -> Result<Vec<u8>> {
        self.send_command(&Command::ReadI2cBlockData { address, register, length })?
            .expect_data()
    }

    fn scan(&mut self) -> Result<Vec<u8>> {
        self.send_command(&Command::Scan)?.expect_devices()
    }

    fn reset_interface(&mut self) -> Result<String> {
        let response = self.send_command(&Command::ResetInterface)?;
        Ok(response
            .message
            .unwrap_or_else(|| "Interface reset successful".to_string()))
    }

    /// Close the connection; the next call reconnects
    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
