//! Per-connection session task.
//!
//! One task per accepted connection. It owns both halves of the framed stream
//! and waits on five things at once:
//!
//! - server shutdown
//! - packets queued for this client by itself or other sessions
//! - the next inbound packet
//! - the idle (send) timeout
//! - the ping cycle
//!
//! Both timers live for the whole session and are reset in place, never
//! recreated. Every packet for the client, including replies to its own
//! commands, goes through the session's outbound queue, so per-client order
//! is the order of enqueueing. The one exception is the farewell (a fatal
//! `ERROR` or a `DISCONNECT`), which is held back until teardown.
//!
//! Every socket write is bounded by the send timeout. A peer that stops
//! reading is dropped like one that stops talking, and its queue cannot grow
//! for longer than that. A queued packet that cannot be encoded is logged and
//! skipped; it never ends the session it was addressed to.
//!
//! Teardown leaves the registry first, so no broadcast is queued after it
//! starts. Packets already queued were addressed to the client while it was
//! logged in and are still delivered, ahead of the farewell.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use metalobby_core::{
    CredentialStore, Environment, Keepalive, KeepaliveConfig, PingOutcome, Session, SessionError,
};
use metalobby_proto::{
    CodecError, DisconnectReason, ErrorCode, Packet, PacketCodec, message,
    message::GARBAGE_RECEIVED,
};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf},
    sync::mpsc,
    time::{self, Instant},
};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};

use crate::{
    ServerError,
    dispatch::{Command, dispatch},
    lobby::Lobby,
    registry::Outbound,
};

/// Serve one connection until it ends, then deregister it.
pub(crate) async fn run<T, C, E>(
    stream: T,
    session_id: u64,
    lobby: Arc<Lobby<C, E>>,
    config: KeepaliveConfig,
    shutdown: CancellationToken,
) where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    C: CredentialStore,
    E: Environment,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (tx, rx) = mpsc::unbounded_channel();

    let mut task = SessionTask {
        session: Session::new(session_id),
        keepalive: Keepalive::new(),
        outbound: Outbound::new(session_id, tx),
        rx,
        inbound: FramedRead::new(read_half, PacketCodec),
        sink: FramedWrite::new(write_half, PacketCodec),
        lobby,
        config,
        shutdown,
    };

    tracing::debug!("session started");
    let farewell = match task.serve().await {
        Ok(exit) => {
            tracing::debug!(client = %task.session.label(), reason = exit.reason, "session ended");
            exit.farewell
        },
        Err(err) => {
            tracing::debug!(client = %task.session.label(), error = %err, "session failed");
            None
        },
    };
    task.teardown(farewell).await;
}

/// Why a session ended and what to tell the client.
struct Exit {
    reason: &'static str,
    /// Written after everything else still queued
    farewell: Option<Packet>,
}

impl Exit {
    fn quiet(reason: &'static str) -> Self {
        Self { reason, farewell: None }
    }

    fn with(reason: &'static str, farewell: Packet) -> Self {
        Self { reason, farewell: Some(farewell) }
    }
}

struct SessionTask<T, C, E> {
    session: Session,
    keepalive: Keepalive,
    outbound: Outbound,
    rx: mpsc::UnboundedReceiver<Packet>,
    inbound: FramedRead<ReadHalf<T>, PacketCodec>,
    sink: FramedWrite<WriteHalf<T>, PacketCodec>,
    lobby: Arc<Lobby<C, E>>,
    config: KeepaliveConfig,
    shutdown: CancellationToken,
}

impl<T, C, E> SessionTask<T, C, E>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    C: CredentialStore,
    E: Environment,
{
    /// Event loop. Runs until a command, a timer, the peer or the server ends
    /// the session.
    async fn serve(&mut self) -> Result<Exit, ServerError> {
        let send_timeout = self.config.send_timeout;
        let ping_cycle = self.config.ping_cycle;

        let idle = time::sleep(send_timeout);
        let ping = time::sleep(ping_cycle);
        tokio::pin!(idle, ping);

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    let farewell = message::disconnect(DisconnectReason::ServerShutdown);
                    return Ok(Exit::with("server shutdown", farewell));
                },

                Some(packet) = self.rx.recv() => {
                    if let Some(exit) = self.write(packet).await? {
                        return Ok(exit);
                    }
                },

                frame = self.inbound.next() => match frame {
                    None => return Ok(Exit::quiet("connection closed by peer")),
                    Some(Err(err)) => {
                        let err = SessionError::from(err);
                        if !err.is_peer_fault() {
                            return Err(err.into());
                        }
                        tracing::warn!(error = %err, "undecodable packet");
                        let farewell = message::error(GARBAGE_RECEIVED, ErrorCode::MalformedPacket);
                        return Ok(Exit::with("undecodable packet", farewell));
                    },
                    Some(Ok(packet)) => {
                        let now = Instant::now();
                        idle.as_mut().reset(now + send_timeout);
                        ping.as_mut().reset(now + ping_cycle);
                        self.keepalive.on_packet();

                        if let Some(exit) = self.handle(packet).await {
                            return Ok(exit);
                        }
                    },
                },

                () = &mut idle => {
                    tracing::info!(client = %self.session.label(), "idle timeout");
                    let farewell = message::disconnect(DisconnectReason::ClientTimeout);
                    return Ok(Exit::with("idle timeout", farewell));
                },

                () = &mut ping => match self.keepalive.on_ping_cycle() {
                    PingOutcome::SendPing => {
                        self.outbound.send(message::ping());
                        ping.as_mut().reset(Instant::now() + ping_cycle);
                    },
                    PingOutcome::Expired => {
                        tracing::info!(client = %self.session.label(), "ping unanswered");
                        let farewell = message::disconnect(DisconnectReason::ClientTimeout);
                        return Ok(Exit::with("ping unanswered", farewell));
                    },
                },
            }
        }
    }

    /// Write one queued packet. `Some` if the peer stopped reading.
    async fn write(&mut self, packet: Packet) -> Result<Option<Exit>, ServerError> {
        match time::timeout(self.config.send_timeout, self.sink.send(packet)).await {
            Ok(Ok(())) => Ok(None),
            Ok(Err(CodecError::Protocol(err))) => {
                let client = self.session.label();
                tracing::warn!(%client, error = %err, "dropping unencodable packet");
                Ok(None)
            },
            Ok(Err(err)) => Err(err.into()),
            Err(_) => {
                tracing::info!(client = %self.session.label(), "write stalled");
                let farewell = message::disconnect(DisconnectReason::ClientTimeout);
                Ok(Some(Exit::with("write stalled", farewell)))
            },
        }
    }

    /// Handle one inbound packet. `Some` if the session must end.
    async fn handle(&mut self, packet: Packet) -> Option<Exit> {
        let mut reader = packet.into_reader();

        let Ok(name) = reader.read_string() else {
            tracing::warn!("empty packet");
            let farewell = message::error(GARBAGE_RECEIVED, ErrorCode::MalformedPacket);
            return Some(Exit::with("empty packet", farewell));
        };

        let Some(command) = Command::from_name(&name) else {
            tracing::warn!(command = %name, "unknown command");
            let farewell = message::error(GARBAGE_RECEIVED, ErrorCode::InvalidCmd);
            return Some(Exit::with("unknown command", farewell));
        };

        tracing::debug!(command = command.name(), fields = reader.remaining(), "packet received");

        let outcome =
            dispatch(&self.lobby, &mut self.session, &self.outbound, command, &mut reader).await;
        let reply = outcome.error.map(|code| message::error(command.name(), code));

        match (outcome.terminate, reply) {
            (false, Some(reply)) => {
                self.outbound.send(reply);
                None
            },
            (false, None) => None,
            (true, Some(reply)) => Some(Exit::with(command.name(), reply)),
            (true, None) => Some(Exit::quiet(command.name())),
        }
    }

    /// Leave the registry, flush what is still queued, send the farewell and
    /// close the socket.
    ///
    /// Nothing can be queued for this session once it is out of the registry,
    /// so the farewell is always the last packet the client sees. The flush
    /// gets one send timeout; whatever the peer has not taken by then is lost.
    async fn teardown(mut self, farewell: Option<Packet>) {
        let previous = self.session.disconnect();

        if let Some(client) = self.lobby.unregister(self.session.id()).await {
            tracing::info!(name = %client.name, "client logged out");
        } else {
            tracing::debug!(state = ?previous, "session was never registered");
        }

        let queued = std::iter::from_fn(|| self.rx.try_recv().ok()).collect::<Vec<_>>();
        let sink = &mut self.sink;
        let flush = async move {
            for packet in queued.into_iter().chain(farewell) {
                match sink.feed(packet).await {
                    Ok(()) => {},
                    Err(CodecError::Protocol(err)) => {
                        tracing::warn!(error = %err, "dropping unencodable packet");
                    },
                    Err(err) => return Err(err),
                }
            }
            sink.close().await
        };

        match time::timeout(self.config.send_timeout, flush).await {
            Ok(Ok(())) => {},
            Ok(Err(err)) => tracing::debug!(error = %err, "closing connection failed"),
            Err(_) => tracing::debug!("peer not reading, unsent packets dropped"),
        }
    }
}
