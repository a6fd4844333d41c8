//! Session lifecycle state machine.
//!
//! Tracks who is on the other end of one connection and how far they have
//! come. The runtime calls [`Session::login`] when a `LOGIN` has been accepted
//! and [`Session::disconnect`] when the session loop ends; nothing else moves
//! the state.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────────────┐  LOGIN ok   ┌───────────┐
//! │ Unauthenticated │────────────>│ Connected │
//! └─────────────────┘             └───────────┘
//!          │                            │
//!          │ error/timeout/DISCONNECT   │ error/timeout/DISCONNECT
//!          ↓                            ↓
//!     ┌──────────────┐            ┌──────────────┐
//!     │ Disconnected │            │ Disconnected │
//!     └──────────────┘            └──────────────┘
//! ```

use std::{fmt, str::FromStr};

use crate::error::SessionError;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Accepted, no successful `LOGIN` yet
    Unauthenticated,
    /// Logged in and present in the registry
    Connected,
    /// Terminal
    Disconnected,
}

/// Permission level of a logged-in client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permissions {
    /// Guests and ordinary accounts
    #[default]
    Regular,
    /// May change the message of the day
    Superuser,
}

impl Permissions {
    /// Wire spelling used in the `LOGIN` reply.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "REGULAR",
            Self::Superuser => "SUPERUSER",
        }
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permissions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "superuser" => Ok(Self::Superuser),
            other => Err(format!("unknown permission level '{other}'")),
        }
    }
}

/// Identity and lifecycle of one client connection.
///
/// # Invariants
///
/// - `Connected` is entered at most once, and only from `Unauthenticated`
/// - `name`, `build_id`, `permissions` and `login_time` change only on that
///   transition
/// - `Disconnected` is terminal
#[derive(Debug, Clone)]
pub struct Session {
    id: u64,
    state: SessionState,
    name: String,
    build_id: String,
    permissions: Permissions,
    login_time: Option<u64>,
}

impl Session {
    /// Create a new session in [`SessionState::Unauthenticated`].
    pub fn new(id: u64) -> Self {
        Self {
            id,
            state: SessionState::Unauthenticated,
            name: String::new(),
            build_id: String::new(),
            permissions: Permissions::Regular,
            login_time: None,
        }
    }

    /// Runtime-assigned session id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while logged in.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Display name. Empty before login.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Client build identifier. Empty before login.
    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Permission level. `Regular` before login.
    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Wall-clock seconds of the successful login. `None` before login.
    pub fn login_time(&self) -> Option<u64> {
        self.login_time
    }

    /// Label for log lines: the name once known, otherwise the id.
    pub fn label(&self) -> String {
        if self.name.is_empty() { format!("#{:016x}", self.id) } else { self.name.clone() }
    }

    /// Record a successful `LOGIN` and enter `Connected`.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` if not `Unauthenticated`
    pub fn login(
        &mut self,
        name: String,
        build_id: String,
        permissions: Permissions,
        now_secs: u64,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Unauthenticated {
            return Err(SessionError::InvalidState { state: self.state, operation: "login" });
        }

        tracing::debug!(session = self.id, %name, %permissions, "session connected");

        self.name = name;
        self.build_id = build_id;
        self.permissions = permissions;
        self.login_time = Some(now_secs);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Enter the terminal `Disconnected` state.
    ///
    /// Returns the state the session was in, so teardown can tell whether it
    /// had been registered.
    pub fn disconnect(&mut self) -> SessionState {
        std::mem::replace(&mut self.state, SessionState::Disconnected)
    }
}
