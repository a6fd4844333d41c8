//! Metalobby production server.
//!
//! A lobby metaserver: clients connect over TCP, log in as guests or
//! registered accounts, see who else is online, chat publicly or privately,
//! and are dropped when they go quiet.
//!
//! # Architecture
//!
//! This crate is the runtime around [`metalobby_core`]'s I/O-free logic. A
//! coordinator task receives accepted connections from a queue and spawns one
//! session task per connection. Sessions share a [`Lobby`] (registry and
//! message of the day behind async locks) and reach each other's sockets only
//! through per-session outbound queues.
//!
//! # Components
//!
//! - [`Server`] / [`ServerHandle`]: coordinator lifecycle (`Running` →
//!   `Stopping` → `Stopped`)
//! - [`Lobby`]: shared registry and MOTD
//! - [`dispatch`]: command table (`LOGIN`, `CHAT`, `MOTD`, `DISCONNECT`,
//!   `PONG`)
//! - [`TcpAcceptor`]: TCP listener feeding the coordinator
//! - [`SystemEnv`]: production environment (real clock, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatch;
mod error;
mod lobby;
mod registry;
mod session;
mod system_env;
mod transport;

use std::{sync::Arc, time::Duration};

pub use error::ServerError;
pub use lobby::{Lobby, LoginRequest};
use metalobby_core::{CredentialStore, Environment, KeepaliveConfig};
use metalobby_proto::DEFAULT_PORT;
pub use registry::{ClientEntry, ClientInfo, ClientRegistry, Outbound};
pub use system_env::SystemEnv;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, watch},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::Instrument;
pub use transport::TcpAcceptor;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:7395")
    pub bind_address: String,
    /// Idle timeout and ping cycle applied to every session
    pub keepalive: KeepaliveConfig,
    /// Accepted connections that may wait for the coordinator
    pub connection_backlog: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
            keepalive: KeepaliveConfig::default(),
            connection_backlog: 64,
        }
    }
}

impl ServerConfig {
    /// Override the idle timeout.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.keepalive.send_timeout = timeout;
        self
    }

    /// Override the ping cycle.
    #[must_use]
    pub fn with_ping_cycle(mut self, cycle: Duration) -> Self {
        self.keepalive.ping_cycle = cycle;
        self
    }
}

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    /// Accepting connections
    Running,
    /// No longer accepting; sessions are being disconnected
    Stopping,
    /// Every session task has exited
    Stopped,
}

/// Lobby server, not yet running.
pub struct Server<C, E> {
    config: ServerConfig,
    lobby: Arc<Lobby<C, E>>,
}

impl<C: CredentialStore, E: Environment> Server<C, E> {
    /// Create a server with an empty lobby.
    pub fn new(config: ServerConfig, store: C, env: E) -> Self {
        Self { config, lobby: Arc::new(Lobby::new(store, env)) }
    }

    /// Start the coordinator.
    ///
    /// Every stream received on `connections` becomes a session. The
    /// coordinator runs until [`ServerHandle::shutdown`] is called or the
    /// sending side of `connections` is dropped.
    pub fn spawn<T>(self, connections: mpsc::Receiver<T>) -> ServerHandle<C, E>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let (phase_tx, phase_rx) = watch::channel(ServerPhase::Running);

        tokio::spawn(coordinate(
            connections,
            Arc::clone(&self.lobby),
            self.config.keepalive,
            shutdown.clone(),
            phase_tx,
        ));

        ServerHandle { lobby: self.lobby, shutdown, phase: phase_rx }
    }
}

/// Control and inspection of a running server.
pub struct ServerHandle<C, E> {
    lobby: Arc<Lobby<C, E>>,
    shutdown: CancellationToken,
    phase: watch::Receiver<ServerPhase>,
}

impl<C: CredentialStore, E: Environment> ServerHandle<C, E> {
    /// Begin orderly shutdown. Calling it again has no further effect.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("shutdown requested");
        }
        self.shutdown.cancel();
    }

    /// Wait until every session has exited.
    pub async fn stopped(&self) {
        let mut phase = self.phase.clone();
        // Sender dropped means the coordinator is gone, which is also stopped.
        let _ = phase.wait_for(|p| *p == ServerPhase::Stopped).await;
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ServerPhase {
        *self.phase.borrow()
    }

    /// Token cancelled when shutdown begins, for tasks such as the acceptor.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of logged-in clients.
    pub async fn client_count(&self) -> usize {
        self.lobby.client_count().await
    }

    /// Logged-in clients in login order.
    pub async fn clients(&self) -> Vec<ClientInfo> {
        self.lobby.clients().await
    }

    /// Current message of the day.
    pub async fn motd(&self) -> String {
        self.lobby.motd().await
    }
}

async fn coordinate<T, C, E>(
    mut connections: mpsc::Receiver<T>,
    lobby: Arc<Lobby<C, E>>,
    keepalive: KeepaliveConfig,
    shutdown: CancellationToken,
    phase: watch::Sender<ServerPhase>,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    C: CredentialStore,
    E: Environment,
{
    let tracker = TaskTracker::new();
    tracing::info!(
        send_timeout = ?keepalive.send_timeout,
        ping_cycle = ?keepalive.ping_cycle,
        "lobby running"
    );

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,

            accepted = connections.recv() => match accepted {
                Some(stream) => {
                    let session_id = lobby.env().random_u64();
                    let span =
                        tracing::info_span!("session", id = %format_args!("{session_id:016x}"));
                    tracker.spawn(
                        session::run(
                            stream,
                            session_id,
                            Arc::clone(&lobby),
                            keepalive,
                            shutdown.child_token(),
                        )
                        .instrument(span),
                    );
                },
                None => {
                    tracing::info!("connection source closed");
                    break;
                },
            },
        }
    }

    phase.send_replace(ServerPhase::Stopping);
    shutdown.cancel();
    drop(connections);

    tracker.close();
    tracing::info!(sessions = tracker.len(), "waiting for sessions to finish");
    tracker.wait().await;

    phase.send_replace(ServerPhase::Stopped);
    tracing::info!("lobby stopped");
}
