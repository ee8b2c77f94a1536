//! Helper protocol
//!
//! Single-command, length-prefixed request/response exchange:
//!
//! ```text
//! [1 byte: tag] [native word: length] [length bytes: payload]   request
//! [1 byte: 0]                                                   ack (success only)
//! ```
//!
//! The length field is `size_of::<usize>()` bytes in host byte order, so
//! both ends must run on the same host. Failure is signalled by closing the
//! connection without an acknowledgement.

pub mod codec;
pub mod types;

pub use codec::{
    read_ack, read_length, read_payload, read_tag, write_ack, write_command, LENGTH_FIELD_SIZE,
};
pub use types::{Command, CommandTag};

use thiserror::Error;

/// Acknowledgement byte written after each successful command
pub const ACK: u8 = 0;

/// Helper protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized command byte: {0}")]
    UnrecognizedCommand(u8),

    #[error("stream ended inside {field}: expected {expected} bytes, got {received}")]
    Truncated {
        field: &'static str,
        expected: usize,
        received: usize,
    },

    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("unexpected acknowledgement byte: {0}")]
    UnexpectedAck(u8),
}

impl ProtocolError {
    /// True when the peer closed the stream in the middle of a command
    pub fn is_truncated(&self) -> bool {
        matches!(self, ProtocolError::Truncated { .. })
    }
}
