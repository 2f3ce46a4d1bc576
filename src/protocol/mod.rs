//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Framing
//!
//! Every message, in both directions, is one frame:
//! ```text
//! ┌──────────────┬──────────────────────────────────────┐
//! │  Len (4, BE) │        UTF-8 JSON body (Len bytes)   │
//! └──────────────┴──────────────────────────────────────┘
//! ```
//!
//! ### Commands (client → server)
//! ```text
//! {"type": "read_byte_data", "address": 80, "register": 16}
//! {"type": "write_i2c_block_data", "address": 80, "register": 0, "data": [1, 2, 3]}
//! {"type": "scan"}
//! ```
//!
//! ### Responses (server → client)
//! ```text
//! {"status": "success", "value": 66}
//! {"status": "success", "devices": [80, 96]}
//! {"status": "error", "message": "Unknown command type: frobnicate"}
//! ```

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, DecodeError, MAX_ADDRESS, MAX_BLOCK_LEN};
pub use response::{Response, Status};
pub use codec::{
    encode_frame, encode_command, decode_command, encode_response, decode_response,
    read_frame, write_frame,
    read_command, write_command,
    read_response, write_response,
    LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE,
};
