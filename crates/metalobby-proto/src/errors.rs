//! Protocol error types.

use std::io;

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while framing or interpreting packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Length prefix smaller than the prefix itself
    #[error("invalid packet length: {0}")]
    InvalidLength(usize),

    /// Encoded packet would not fit the 16-bit length prefix
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge {
        /// Size the packet would have on the wire
        size: usize,
        /// Largest size the length prefix can express
        max: usize,
    },

    /// Last field of a packet is missing its NUL terminator
    #[error("unterminated field at end of packet")]
    UnterminatedField,

    /// Outgoing field contains a NUL byte and cannot be framed
    #[error("field {index} contains a NUL byte")]
    EmbeddedNul {
        /// Position of the offending field
        index: usize,
    },

    /// Field bytes are not valid UTF-8
    #[error("field {index} is not valid UTF-8")]
    InvalidUtf8 {
        /// Position of the offending field
        index: usize,
    },

    /// Read past the last field of a packet
    #[error("missing field {index}")]
    MissingField {
        /// Position that was requested
        index: usize,
    },

    /// Field could not be parsed as an integer
    #[error("field {index} is not an integer: {value:?}")]
    InvalidInt {
        /// Position of the offending field
        index: usize,
        /// Raw field content
        value: String,
    },

    /// Field could not be parsed as a boolean
    #[error("field {index} is not a boolean: {value:?}")]
    InvalidBool {
        /// Position of the offending field
        index: usize,
        /// Raw field content
        value: String,
    },
}

/// Stream codec error: either a framing violation or an I/O failure.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Peer sent bytes that do not form a valid packet
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Underlying transport failed
    #[error(transparent)]
    Io(#[from] io::Error),
}
