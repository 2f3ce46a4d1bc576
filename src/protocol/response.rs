//! Response definitions
//!
//! Represents responses to clients.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// A response to send to client
///
/// At most one payload field is populated, depending on the command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,

    /// Byte or word read result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u16>,

    /// Block read result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,

    /// Scan result, ascending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<u8>>,

    /// Error text, or confirmation text for control commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// Create a success response with no payload
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            value: None,
            data: None,
            devices: None,
            message: None,
        }
    }

    pub fn with_value(value: u16) -> Self {
        Self {
            value: Some(value),
            ..Self::success()
        }
    }

    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            ..Self::success()
        }
    }

    pub fn with_devices(devices: Vec<u8>) -> Self {
        Self {
            devices: Some(devices),
            ..Self::success()
        }
    }

    /// Create a success response carrying a human-readable message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success()
        }
    }

    /// Create an ERROR response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            ..Self::success()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Turn an error response into [`BridgeError::Remote`]
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            Status::Success => Ok(self),
            Status::Error => Err(BridgeError::Remote(
                self.message.unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Payload extraction (missing field is a protocol violation)
    // -------------------------------------------------------------------------

    pub fn expect_value(&self) -> Result<u16> {
        self.value.ok_or_else(|| missing("value"))
    }

    /// Like `expect_value`, but the value must fit in a byte
    pub fn expect_byte(&self) -> Result<u8> {
        let value = self.expect_value()?;
        u8::try_from(value).map_err(|_| {
            BridgeError::Protocol(format!("value {} does not fit in a byte", value))
        })
    }

    pub fn expect_data(&self) -> Result<Vec<u8>> {
        self.data.clone().ok_or_else(|| missing("data"))
    }

    pub fn expect_devices(&self) -> Result<Vec<u8>> {
        self.devices.clone().ok_or_else(|| missing("devices"))
    }

    pub fn expect_message(&self) -> Result<String> {
        self.message.clone().ok_or_else(|| missing("message"))
    }
}

fn missing(field: &str) -> BridgeError {
    BridgeError::Protocol(format!("response is missing the '{}' field", field))
}
