//! Error types for session logic.
//!
//! Strongly-typed errors for lifecycle violations and for failures surfaced
//! while a session is being served. We avoid `std::io::Error` in protocol
//! logic so callers can tell a broken peer from a broken socket.

use std::io;

use metalobby_proto::{CodecError, ProtocolError};
use thiserror::Error;

use crate::session::SessionState;

/// Errors that can occur during session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Peer sent a packet that could not be interpreted
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    /// Returns true if the peer, not the transport, is at fault.
    ///
    /// Peer faults are answered with an `ERROR` before the session ends;
    /// transport faults end the session silently because nothing can be sent.
    pub fn is_peer_fault(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::InvalidState { .. })
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Protocol(e) => Self::Protocol(e),
            CodecError::Io(e) => Self::from(e),
        }
    }
}
