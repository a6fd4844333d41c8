//! In-memory server and clients.
//!
//! [`TestLobby`] runs the production coordinator with its connection queue fed
//! by [`tokio::io::duplex`] pipes instead of a TCP listener. Each
//! [`TestClient`] holds the other end of one pipe, framed with the same codec
//! the server uses.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use metalobby_core::MemoryCredentialStore;
use metalobby_proto::{CodecError, Packet, PacketCodec};
use metalobby_server::{Server, ServerConfig, ServerHandle};
use tokio::{
    io::DuplexStream,
    sync::mpsc,
    time::timeout,
};
use tokio_util::codec::Framed;

use crate::SimEnv;

/// Pipe buffer size per direction.
const PIPE_CAPACITY: usize = 64 * 1024;

/// How long [`TestClient::recv`] waits before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(3600);

/// A running server reachable through in-memory connections.
pub struct TestLobby {
    handle: ServerHandle<MemoryCredentialStore, SimEnv>,
    connections: mpsc::Sender<DuplexStream>,
    env: SimEnv,
}

impl TestLobby {
    /// Start a guest-only server with default configuration.
    pub fn start() -> Self {
        Self::with_config(ServerConfig::default(), MemoryCredentialStore::new())
    }

    /// Start a server with default configuration and the given accounts.
    pub fn with_accounts(store: MemoryCredentialStore) -> Self {
        Self::with_config(ServerConfig::default(), store)
    }

    /// Start a server with explicit configuration and accounts.
    pub fn with_config(config: ServerConfig, store: MemoryCredentialStore) -> Self {
        let env = SimEnv::new();
        let (tx, rx) = mpsc::channel(config.connection_backlog);
        let handle = Server::new(config, store, env.clone()).spawn(rx);
        Self { handle, connections: tx, env }
    }

    /// Open a new connection.
    ///
    /// Returns `None` once the server has stopped accepting.
    pub async fn connect(&self) -> Option<TestClient> {
        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        self.connections.send(server).await.ok()?;
        Some(TestClient::new(client))
    }

    /// Control handle of the running server.
    pub fn handle(&self) -> &ServerHandle<MemoryCredentialStore, SimEnv> {
        &self.handle
    }

    /// Environment shared with the server.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Shut the server down and wait for every session to exit.
    pub async fn shutdown(&self) {
        self.handle.shutdown();
        self.handle.stopped().await;
    }
}

/// Client end of one in-memory connection.
pub struct TestClient {
    framed: Framed<DuplexStream, PacketCodec>,
}

impl TestClient {
    /// Frame the client end of a pipe.
    pub fn new(stream: DuplexStream) -> Self {
        Self { framed: Framed::new(stream, PacketCodec) }
    }

    /// Send a packet.
    pub async fn send(&mut self, packet: Packet) -> Result<(), CodecError> {
        self.framed.send(packet).await
    }

    /// Send a packet given as raw fields, command first.
    pub async fn send_fields(&mut self, fields: &[&str]) -> Result<(), CodecError> {
        self.send(Packet::from_fields(fields.iter().copied())).await
    }

    /// Send `LOGIN` for a guest.
    pub async fn login_guest(&mut self, name: &str) -> Result<(), CodecError> {
        self.send_fields(&["LOGIN", "0", name, "test-build", "false"]).await
    }

    /// Send `LOGIN` for a registered account.
    pub async fn login_registered(
        &mut self,
        name: &str,
        password: &str,
    ) -> Result<(), CodecError> {
        self.send_fields(&["LOGIN", "0", name, "test-build", "true", password]).await
    }

    /// Next packet from the server.
    ///
    /// `None` if the connection closed, the stream was undecodable, or nothing
    /// arrived for an hour of (possibly paused) time.
    pub async fn recv(&mut self) -> Option<Packet> {
        match timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(packet))) => Some(packet),
            Ok(Some(Err(err))) => {
                tracing::warn!(error = %err, "test client failed to decode");
                None
            },
            Ok(None) | Err(_) => None,
        }
    }

    /// A packet that is already on its way, without letting timers run.
    ///
    /// Under a paused clock this lets every runnable task finish and then
    /// gives up after one millisecond, so it never triggers keepalive timers
    /// set further out.
    pub async fn try_recv(&mut self) -> Option<Packet> {
        match timeout(Duration::from_millis(1), self.framed.next()).await {
            Ok(Some(Ok(packet))) => Some(packet),
            _ => None,
        }
    }

    /// Log in as a guest and consume the `LOGIN`, `TIME` and `CLIENTS_UPDATE`
    /// replies. Returns the name the server assigned.
    pub async fn join(&mut self, name: &str) -> Option<String> {
        self.login_guest(name).await.ok()?;
        let login = self.recv().await?;
        let assigned = login.fields().get(1).cloned();
        self.recv().await?;
        self.recv().await?;
        assigned
    }

    /// Read until the server closes the connection.
    ///
    /// Returns everything received on the way.
    pub async fn drain_until_closed(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Some(packet) = self.recv().await {
            packets.push(packet);
        }
        packets
    }
}
