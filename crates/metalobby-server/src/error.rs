//! Server error types.

use std::fmt;

use metalobby_core::SessionError;
use metalobby_proto::CodecError;

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, bad account spec, etc.).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error (bind failure, socket I/O, etc.).
    ///
    /// Fatal when binding; ends only the affected session otherwise.
    Transport(String),

    /// Protocol error (a packet that cannot be framed or understood).
    ///
    /// Fatal for that connection, but the server keeps serving other clients.
    Protocol(String),

    /// Internal error (unexpected state, logic bug, etc.).
    ///
    /// Should never happen in correct implementation. Indicates a bug.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<CodecError> for ServerError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Protocol(e) => Self::Protocol(e.to_string()),
            CodecError::Io(e) => Self::from(e),
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Transport(msg) => Self::Transport(msg),
            SessionError::Protocol(e) => Self::Protocol(e.to_string()),
            other @ SessionError::InvalidState { .. } => Self::Internal(other.to_string()),
        }
    }
}
