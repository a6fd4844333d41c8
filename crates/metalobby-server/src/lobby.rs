//! Server-wide state shared by every session.
//!
//! The lobby owns the client registry and the message of the day. Both sit
//! behind async locks, and every operation that must be atomic with respect to
//! other sessions (claiming a name, announcing a login, replacing the MOTD)
//! happens inside a single critical section.
//!
//! Lock order is always MOTD before registry.

use metalobby_core::{CredentialStore, Environment, Permissions, Session, resolve_guest_name};
use metalobby_proto::{ErrorCode, Packet, message};
use tokio::sync::{Mutex, RwLock};

use crate::registry::{ClientEntry, ClientInfo, ClientRegistry, Outbound};

/// Fields of a `LOGIN` request after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    /// Requested display name
    pub name: String,
    /// Client build identifier
    pub build_id: String,
    /// Present for registered accounts, absent for guests
    pub password: Option<String>,
}

/// Registry, MOTD, account store and environment for one server.
pub struct Lobby<C, E> {
    registry: Mutex<ClientRegistry>,
    motd: RwLock<String>,
    store: C,
    env: E,
}

impl<C: CredentialStore, E: Environment> Lobby<C, E> {
    /// Create an empty lobby with no MOTD.
    pub fn new(store: C, env: E) -> Self {
        Self {
            registry: Mutex::new(ClientRegistry::new()),
            motd: RwLock::new(String::new()),
            store,
            env,
        }
    }

    /// Environment used for timestamps and session ids.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Authenticate `request` and log `session` in.
    ///
    /// On success the session is `Connected`, its queue holds `LOGIN` then
    /// `TIME` (then the MOTD if one is set), it is in the registry, and every
    /// logged-in client including the new one has been sent `CLIENTS_UPDATE`.
    /// Nothing else can reach the new session's queue ahead of its `LOGIN`.
    ///
    /// # Errors
    ///
    /// - `ErrorCode::AlreadyLoggedIn` if a registered name is already online
    /// - `ErrorCode::WrongPassword` if the account is unknown or the password
    ///   does not match
    pub async fn admit(
        &self,
        session: &mut Session,
        request: LoginRequest,
        outbound: &Outbound,
    ) -> Result<(), ErrorCode> {
        let motd = self.motd.read().await;
        let mut registry = self.registry.lock().await;

        let LoginRequest { name, build_id, password } = request;
        let (name, permissions) = match password {
            Some(password) => {
                if registry.contains_name(&name) {
                    return Err(ErrorCode::AlreadyLoggedIn);
                }
                let known = self.store.contains_name(&name);
                if !known || !self.store.password_correct(&name, &password) {
                    return Err(ErrorCode::WrongPassword);
                }
                let permissions = self.store.permissions(&name);
                (name, permissions)
            },
            None => {
                let name = resolve_guest_name(&name, |candidate| {
                    self.store.contains_name(candidate) || registry.contains_name(candidate)
                });
                (name, Permissions::Regular)
            },
        };

        let now = self.env.wall_clock_secs();
        let entry = ClientEntry {
            session_id: session.id(),
            name: name.clone(),
            build_id: build_id.clone(),
            permissions,
            login_time: now,
            outbound: outbound.clone(),
        };
        if !registry.insert(entry) {
            tracing::error!(%name, session = session.id(), "registry rejected login");
            return Err(ErrorCode::AlreadyLoggedIn);
        }
        if let Err(err) = session.login(name, build_id, permissions, now) {
            tracing::error!(error = %err, "session refused login");
            registry.remove(session.id());
            return Err(ErrorCode::AlreadyLoggedIn);
        }

        outbound.send(message::login(session.name(), permissions.as_str()));
        outbound.send(message::time(now));
        registry.broadcast(&message::clients_update());

        if !motd.is_empty() {
            outbound.send(message::system_chat(&motd));
        }

        Ok(())
    }

    /// Remove a session from the registry and tell everyone else.
    ///
    /// `None` (and no broadcast) if the session was never logged in.
    pub async fn unregister(&self, session_id: u64) -> Option<ClientInfo> {
        let mut registry = self.registry.lock().await;
        let entry = registry.remove(session_id)?;
        registry.broadcast(&message::clients_update());
        Some(ClientInfo::from(&entry))
    }

    /// Queue `packet` to every logged-in client.
    pub async fn broadcast(&self, packet: &Packet) -> usize {
        self.registry.lock().await.broadcast(packet)
    }

    /// Queue `packet` to the client named `name`.
    ///
    /// Returns false if nobody by that name is logged in.
    pub async fn send_to(&self, name: &str, packet: Packet) -> bool {
        let registry = self.registry.lock().await;
        registry.find_by_name(name).is_some_and(|entry| entry.outbound.send(packet))
    }

    /// Current message of the day. Empty if unset.
    pub async fn motd(&self) -> String {
        self.motd.read().await.clone()
    }

    /// Replace the message of the day and broadcast it as a system chat.
    pub async fn set_motd(&self, text: String) {
        let mut motd = self.motd.write().await;
        let announcement = message::system_chat(&text);
        *motd = text;
        self.registry.lock().await.broadcast(&announcement);
    }

    /// Number of logged-in clients.
    pub async fn client_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Snapshot of logged-in clients in login order.
    pub async fn clients(&self) -> Vec<ClientInfo> {
        self.registry.lock().await.snapshot()
    }
}
