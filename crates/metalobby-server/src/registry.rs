//! Registry of logged-in clients.
//!
//! Entries are kept in login order and only ever describe `Connected`
//! sessions: a session is inserted when its `LOGIN` succeeds and removed when
//! its loop exits. Each entry carries the session's [`Outbound`] queue, which
//! is the only way anything other than the session itself reaches its socket.
//!
//! The registry is a plain data structure; [`crate::Lobby`] puts it behind a
//! lock.

use metalobby_core::Permissions;
use metalobby_proto::Packet;
use tokio::sync::mpsc;

/// Sending side of a session's outbound queue.
///
/// Sends never block and never fail loudly: a session that is tearing down
/// simply stops draining its queue.
#[derive(Debug, Clone)]
pub struct Outbound {
    session_id: u64,
    tx: mpsc::UnboundedSender<Packet>,
}

impl Outbound {
    /// Wrap the sending half of a session's queue.
    pub fn new(session_id: u64, tx: mpsc::UnboundedSender<Packet>) -> Self {
        Self { session_id, tx }
    }

    /// Session this queue belongs to.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Queue `packet` for delivery. Returns false if the session is gone.
    pub fn send(&self, packet: Packet) -> bool {
        self.tx.send(packet).is_ok()
    }
}

/// A logged-in client.
#[derive(Debug, Clone)]
pub struct ClientEntry {
    /// Owning session
    pub session_id: u64,
    /// Display name, unique within the registry
    pub name: String,
    /// Client build identifier
    pub build_id: String,
    /// Permission level
    pub permissions: Permissions,
    /// Wall-clock seconds of the login
    pub login_time: u64,
    /// Queue into the session's socket
    pub outbound: Outbound,
}

/// Read-only snapshot of a logged-in client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Display name
    pub name: String,
    /// Client build identifier
    pub build_id: String,
    /// Permission level
    pub permissions: Permissions,
    /// Wall-clock seconds of the login
    pub login_time: u64,
}

impl From<&ClientEntry> for ClientInfo {
    fn from(entry: &ClientEntry) -> Self {
        Self {
            name: entry.name.clone(),
            build_id: entry.build_id.clone(),
            permissions: entry.permissions,
            login_time: entry.login_time,
        }
    }
}

/// Ordered set of logged-in clients.
///
/// # Invariants
///
/// - At most one entry per name
/// - At most one entry per session id
#[derive(Debug, Default)]
pub struct ClientRegistry {
    entries: Vec<ClientEntry>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a client.
    ///
    /// Returns `false` and leaves the registry unchanged if the name or the
    /// session id is already present.
    pub fn insert(&mut self, entry: ClientEntry) -> bool {
        let clash = self
            .entries
            .iter()
            .any(|e| e.name == entry.name || e.session_id == entry.session_id);
        if clash {
            return false;
        }

        self.entries.push(entry);
        true
    }

    /// Remove the entry owned by `session_id`.
    ///
    /// `None` if the session never logged in.
    pub fn remove(&mut self, session_id: u64) -> Option<ClientEntry> {
        let index = self.entries.iter().position(|e| e.session_id == session_id)?;
        Some(self.entries.remove(index))
    }

    /// Entry with display name `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&ClientEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Check if a client with display name `name` is logged in.
    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    /// Number of logged-in clients.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nobody is logged in.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in login order.
    pub fn iter(&self) -> impl Iterator<Item = &ClientEntry> {
        self.entries.iter()
    }

    /// Queue `packet` to every logged-in client, in login order.
    ///
    /// Returns how many queues accepted it.
    pub fn broadcast(&self, packet: &Packet) -> usize {
        self.entries.iter().filter(|e| e.outbound.send(packet.clone())).count()
    }

    /// Snapshot of every logged-in client, in login order.
    pub fn snapshot(&self) -> Vec<ClientInfo> {
        self.entries.iter().map(ClientInfo::from).collect()
    }
}
