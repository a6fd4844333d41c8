//! Server-to-client vocabulary.
//!
//! Builders for every packet the lobby emits plus the fixed codes carried in
//! `ERROR`, `DISCONNECT` and `CHAT` packets. Keeping them here means the wire
//! spelling of each code lives in exactly one place.

use std::fmt;

use crate::{Packet, ProtocolError};

/// Code carried in an `ERROR <command> <code>` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `LOGIN` with a protocol version other than [`crate::PROTOCOL_VERSION`]
    UnsupportedProtocol,
    /// Name is already held by a logged-in client
    AlreadyLoggedIn,
    /// Unknown account or wrong password (deliberately indistinguishable)
    WrongPassword,
    /// Command needs a higher permission level
    DeficientPermission,
    /// Command needs a completed `LOGIN`
    NotLoggedIn,
    /// Command name not in the dispatch table
    InvalidCmd,
    /// Packet fields missing or of the wrong type
    MalformedPacket,
    /// Relayed message would not fit in one packet
    MessageTooLong,
}

impl ErrorCode {
    /// Wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedProtocol => "UNSUPPORTED_PROTOCOL",
            Self::AlreadyLoggedIn => "ALREADY_LOGGED_IN",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::DeficientPermission => "DEFICIENT_PERMISSION",
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::InvalidCmd => "INVALID_CMD",
            Self::MalformedPacket => "MALFORMED_PACKET",
            Self::MessageTooLong => "MESSAGE_TOO_LONG",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ProtocolError> for ErrorCode {
    fn from(_: &ProtocolError) -> Self {
        Self::MalformedPacket
    }
}

/// Reason carried in a server-initiated `DISCONNECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client went silent or stopped answering pings
    ClientTimeout,
    /// Server is shutting down
    ServerShutdown,
}

impl DisconnectReason {
    /// Wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientTimeout => "CLIENT_TIMEOUT",
            Self::ServerShutdown => "SERVER_SHUTDOWN",
        }
    }
}

/// Audience marker on a `CHAT` packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// Broadcast from a client to everyone
    Public,
    /// Addressed to a single client
    Private,
    /// Server-originated (message of the day)
    System,
}

impl ChatKind {
    /// Wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::System => "system",
        }
    }
}

/// Pseudo-command used in the `ERROR` reply to an unknown command.
pub const GARBAGE_RECEIVED: &str = "GARBAGE_RECEIVED";

/// `LOGIN <name> <permissions>`
pub fn login(name: &str, permissions: &str) -> Packet {
    Packet::new("LOGIN").string(name).string(permissions)
}

/// `TIME <unix seconds>`
pub fn time(unix_secs: u64) -> Packet {
    Packet::new("TIME").int(i64::try_from(unix_secs).unwrap_or(i64::MAX))
}

/// `CHAT <sender> <message> <kind>`
pub fn chat(sender: &str, message: &str, kind: ChatKind) -> Packet {
    Packet::new("CHAT").string(sender).string(message).string(kind.as_str())
}

/// `CHAT "" <message> system`
pub fn system_chat(message: &str) -> Packet {
    chat("", message, ChatKind::System)
}

/// `ERROR <command> <code>`
pub fn error(command: &str, code: ErrorCode) -> Packet {
    Packet::new("ERROR").string(command).string(code.as_str())
}

/// `DISCONNECT <reason>`
pub fn disconnect(reason: DisconnectReason) -> Packet {
    Packet::new("DISCONNECT").string(reason.as_str())
}

/// `PING`
pub fn ping() -> Packet {
    Packet::new("PING")
}

/// `CLIENTS_UPDATE`
pub fn clients_update() -> Packet {
    Packet::new("CLIENTS_UPDATE")
}
