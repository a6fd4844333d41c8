//! TCP listener feeding the coordinator.
//!
//! The acceptor binds, accepts and hands each stream to the coordinator
//! through a bounded queue. Everything that happens on a connection after
//! that belongs to its session task.

use std::net::SocketAddr;

use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::error::ServerError;

/// Listening TCP socket.
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Bind to `address` (e.g. "0.0.0.0:7395").
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if `address` is not a socket address
    /// - `ServerError::Transport` if the port cannot be bound
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!("TCP transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Local address the acceptor is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections and forward them to the coordinator.
    ///
    /// Runs until `shutdown` is cancelled or the coordinator stops receiving.
    /// A failed accept is logged and the loop carries on.
    pub async fn forward(self, connections: mpsc::Sender<TcpStream>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,
                () = connections.closed() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(%peer, "connection accepted");
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(%peer, "set_nodelay failed: {}", e);
                        }
                        if connections.send(stream).await.is_err() {
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    },
                },
            }
        }

        tracing::info!("acceptor stopped");
    }
}
