//! Wire format for the metalobby protocol.
//!
//! A connection carries a stream of packets. Each packet is an ordered list of
//! string fields; the first field is always the command name. Integers and
//! booleans ride as their textual forms and are interpreted by
//! [`PacketReader`] on the receiving side.
//!
//! # Components
//!
//! - [`Packet`]: owned field list with a builder for outgoing packets
//! - [`PacketReader`]: typed, sequential reads over an incoming packet
//! - [`PacketCodec`]: `tokio_util` codec framing packets on a byte stream
//! - [`message`]: the server's outgoing vocabulary (`LOGIN`, `CHAT`, `PING`..)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod message;
pub mod packet;

pub use codec::PacketCodec;
pub use errors::{CodecError, ProtocolError, Result};
pub use message::{ChatKind, DisconnectReason, ErrorCode};
pub use packet::{Packet, PacketReader};

/// Only protocol version accepted in `LOGIN`.
pub const PROTOCOL_VERSION: i64 = 0;

/// Default TCP port the lobby listens on.
pub const DEFAULT_PORT: u16 = 7395;
