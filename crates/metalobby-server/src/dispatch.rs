//! Command dispatch table.
//!
//! Maps the command name of an incoming packet to its handler. The table is a
//! closed enum: anything [`Command::from_name`] does not recognise never
//! reaches a handler and is rejected by the session loop.
//!
//! Each handler yields an [`Outcome`]: an optional error code to report back
//! as `ERROR <command> <code>`, and whether the session must end.

use metalobby_core::{CredentialStore, Environment, Permissions, Session};
use metalobby_proto::{
    ChatKind, ErrorCode, PROTOCOL_VERSION, PacketCodec, PacketReader, ProtocolError, message,
};

use crate::{
    lobby::{Lobby, LoginRequest},
    registry::Outbound,
};

/// Commands a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `LOGIN <version> <name> <build_id> <registered> [<password>]`
    Login,
    /// `CHAT <message> <receiver>`
    Chat,
    /// `MOTD <message>`
    Motd,
    /// `DISCONNECT <reason>`
    Disconnect,
    /// `PONG`
    Pong,
}

impl Command {
    /// Look up a command by its exact, case-sensitive wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "LOGIN" => Some(Self::Login),
            "CHAT" => Some(Self::Chat),
            "MOTD" => Some(Self::Motd),
            "DISCONNECT" => Some(Self::Disconnect),
            "PONG" => Some(Self::Pong),
            _ => None,
        }
    }

    /// Wire name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Chat => "CHAT",
            Self::Motd => "MOTD",
            Self::Disconnect => "DISCONNECT",
            Self::Pong => "PONG",
        }
    }

    /// True for commands only a logged-in client may send.
    pub const fn requires_login(self) -> bool {
        matches!(self, Self::Chat | Self::Motd)
    }
}

/// Result of handling one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Reported as `ERROR <command> <code>` when set
    pub error: Option<ErrorCode>,
    /// End the session after reporting
    pub terminate: bool,
}

impl Outcome {
    /// Handled, keep going.
    pub const CONTINUE: Self = Self { error: None, terminate: false };

    /// Handled, end the session.
    pub const TERMINATE: Self = Self { error: None, terminate: true };

    /// Report `code` and keep going.
    pub const fn fail(code: ErrorCode) -> Self {
        Self { error: Some(code), terminate: false }
    }

    /// Report `code` and end the session.
    pub const fn fatal(code: ErrorCode) -> Self {
        Self { error: Some(code), terminate: true }
    }
}

/// Run the handler for `command` over the rest of the packet.
///
/// Commands that need a login are refused before their handler runs. A field
/// that is missing or of the wrong type ends the session with
/// `MALFORMED_PACKET`.
pub async fn dispatch<C: CredentialStore, E: Environment>(
    lobby: &Lobby<C, E>,
    session: &mut Session,
    outbound: &Outbound,
    command: Command,
    reader: &mut PacketReader,
) -> Outcome {
    if command.requires_login() && !session.is_connected() {
        tracing::warn!(command = command.name(), "command before login");
        return Outcome::fatal(ErrorCode::NotLoggedIn);
    }

    let result = match command {
        Command::Login => handle_login(lobby, session, outbound, reader).await,
        Command::Chat => handle_chat(lobby, session, reader).await,
        Command::Motd => handle_motd(lobby, session, reader).await,
        Command::Disconnect => handle_disconnect(session, reader),
        Command::Pong => Ok(Outcome::CONTINUE),
    };

    result.unwrap_or_else(|err| {
        tracing::warn!(command = command.name(), error = %err, "malformed packet");
        Outcome::fatal(ErrorCode::from(&err))
    })
}

async fn handle_login<C: CredentialStore, E: Environment>(
    lobby: &Lobby<C, E>,
    session: &mut Session,
    outbound: &Outbound,
    reader: &mut PacketReader,
) -> Result<Outcome, ProtocolError> {
    if session.is_connected() {
        return Ok(Outcome::fail(ErrorCode::AlreadyLoggedIn));
    }

    let version = reader.read_int()?;
    if version != PROTOCOL_VERSION {
        tracing::info!(version, "unsupported protocol version");
        return Ok(Outcome::fatal(ErrorCode::UnsupportedProtocol));
    }

    let name = reader.read_string()?;
    let build_id = reader.read_string()?;
    let password = if reader.read_bool()? { Some(reader.read_string()?) } else { None };
    let registered = password.is_some();

    match lobby.admit(session, LoginRequest { name, build_id, password }, outbound).await {
        Ok(()) => {
            tracing::info!(
                name = session.name(),
                build_id = session.build_id(),
                permissions = %session.permissions(),
                registered,
                "client logged in"
            );
            Ok(Outcome::CONTINUE)
        },
        Err(code) => {
            tracing::info!(%code, registered, "login refused");
            Ok(Outcome::fatal(code))
        },
    }
}

async fn handle_chat<C: CredentialStore, E: Environment>(
    lobby: &Lobby<C, E>,
    session: &Session,
    reader: &mut PacketReader,
) -> Result<Outcome, ProtocolError> {
    let text = sanitize(&reader.read_string()?);
    let receiver = reader.read_string()?;

    let kind = if receiver.is_empty() { ChatKind::Public } else { ChatKind::Private };
    let packet = message::chat(session.name(), &text, kind);
    if !PacketCodec::fits(&packet) {
        tracing::debug!(from = session.name(), len = text.len(), "chat too long to relay");
        return Ok(Outcome::fail(ErrorCode::MessageTooLong));
    }

    if receiver.is_empty() {
        lobby.broadcast(&packet).await;
    } else if !lobby.send_to(&receiver, packet).await {
        tracing::debug!(
            from = session.name(),
            to = %receiver,
            "private chat to offline user dropped"
        );
    }

    Ok(Outcome::CONTINUE)
}

async fn handle_motd<C: CredentialStore, E: Environment>(
    lobby: &Lobby<C, E>,
    session: &Session,
    reader: &mut PacketReader,
) -> Result<Outcome, ProtocolError> {
    let text = reader.read_string()?;

    if session.permissions() != Permissions::Superuser {
        return Ok(Outcome::fail(ErrorCode::DeficientPermission));
    }
    if !PacketCodec::fits(&message::system_chat(&text)) {
        return Ok(Outcome::fail(ErrorCode::MessageTooLong));
    }

    tracing::info!(by = session.name(), motd = %text, "message of the day changed");
    lobby.set_motd(text).await;
    Ok(Outcome::CONTINUE)
}

fn handle_disconnect(
    session: &Session,
    reader: &mut PacketReader,
) -> Result<Outcome, ProtocolError> {
    let reason = reader.read_string()?;
    tracing::info!(client = %session.label(), %reason, "client leaving");
    Ok(Outcome::TERMINATE)
}

/// Escape `<` so chat text cannot carry markup.
fn sanitize(text: &str) -> String {
    text.replace('<', "&lt;")
}
