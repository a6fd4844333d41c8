//! End-to-end lobby scenarios over in-memory connections.
//!
//! Every test runs the real coordinator and session tasks with a paused tokio
//! clock, so keepalive timers never fire unless a test waits for them.

use metalobby_core::{MemoryCredentialStore, Permissions};
use metalobby_harness::{TestLobby, sim_env::DEFAULT_WALL_CLOCK};
use metalobby_proto::{ChatKind, DisconnectReason, ErrorCode, message};
use metalobby_server::ServerPhase;

fn accounts() -> MemoryCredentialStore {
    MemoryCredentialStore::new()
        .with_account("root", "hunter2", Permissions::Superuser)
        .with_account("bob", "secret", Permissions::Regular)
}

#[tokio::test(start_paused = true)]
async fn guest_login_on_empty_server() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();

    alice.send_fields(&["LOGIN", "0", "alice", "1.0", "false"]).await.unwrap();

    assert_eq!(alice.recv().await, Some(message::login("alice", "REGULAR")));
    assert_eq!(alice.recv().await, Some(message::time(DEFAULT_WALL_CLOCK)));
    assert_eq!(alice.recv().await, Some(message::clients_update()));
    assert_eq!(lobby.handle().client_count().await, 1);

    let clients = lobby.handle().clients().await;
    assert_eq!(clients[0].name, "alice");
    assert_eq!(clients[0].build_id, "1.0");
    assert_eq!(clients[0].login_time, DEFAULT_WALL_CLOCK);
}

#[tokio::test(start_paused = true)]
async fn second_guest_with_same_name_gets_suffix() {
    let lobby = TestLobby::start();
    let mut first = lobby.connect().await.unwrap();
    let mut second = lobby.connect().await.unwrap();

    assert_eq!(first.join("alice").await.as_deref(), Some("alice"));
    assert_eq!(second.join("alice").await.as_deref(), Some("alice1"));

    // The first client hears about the second login.
    assert_eq!(first.recv().await, Some(message::clients_update()));

    let names: Vec<_> = lobby.handle().clients().await.into_iter().map(|c| c.name).collect();
    assert_eq!(names, ["alice", "alice1"]);
}

#[tokio::test(start_paused = true)]
async fn guest_cannot_take_a_registered_name() {
    let lobby = TestLobby::with_accounts(accounts());
    let mut guest = lobby.connect().await.unwrap();

    assert_eq!(guest.join("bob").await.as_deref(), Some("bob1"));
}

#[tokio::test(start_paused = true)]
async fn time_reply_follows_wall_clock() {
    let lobby = TestLobby::start();
    lobby.env().advance_wall_clock(3600);
    let mut client = lobby.connect().await.unwrap();

    client.login_guest("alice").await.unwrap();

    assert_eq!(client.recv().await, Some(message::login("alice", "REGULAR")));
    assert_eq!(client.recv().await, Some(message::time(DEFAULT_WALL_CLOCK + 3600)));
}

#[tokio::test(start_paused = true)]
async fn unsupported_protocol_closes_session() {
    let lobby = TestLobby::start();
    let mut client = lobby.connect().await.unwrap();

    client.send_fields(&["LOGIN", "7", "alice", "1.0", "false"]).await.unwrap();

    assert_eq!(
        client.drain_until_closed().await,
        [message::error("LOGIN", ErrorCode::UnsupportedProtocol)]
    );
    assert_eq!(lobby.handle().client_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn registered_login_with_wrong_password() {
    let lobby = TestLobby::with_accounts(accounts());
    let mut client = lobby.connect().await.unwrap();

    client.login_registered("root", "guess").await.unwrap();

    assert_eq!(
        client.drain_until_closed().await,
        [message::error("LOGIN", ErrorCode::WrongPassword)]
    );
}

#[tokio::test(start_paused = true)]
async fn registered_login_with_unknown_account() {
    let lobby = TestLobby::with_accounts(accounts());
    let mut client = lobby.connect().await.unwrap();

    client.login_registered("mallory", "secret").await.unwrap();

    assert_eq!(
        client.drain_until_closed().await,
        [message::error("LOGIN", ErrorCode::WrongPassword)]
    );
}

#[tokio::test(start_paused = true)]
async fn registered_account_cannot_log_in_twice() {
    let lobby = TestLobby::with_accounts(accounts());
    let mut first = lobby.connect().await.unwrap();
    let mut second = lobby.connect().await.unwrap();

    first.login_registered("root", "hunter2").await.unwrap();
    assert_eq!(first.recv().await, Some(message::login("root", "SUPERUSER")));

    second.login_registered("root", "hunter2").await.unwrap();
    assert_eq!(
        second.drain_until_closed().await,
        [message::error("LOGIN", ErrorCode::AlreadyLoggedIn)]
    );
    assert_eq!(lobby.handle().client_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn login_twice_on_one_connection_is_reported() {
    let lobby = TestLobby::start();
    let mut client = lobby.connect().await.unwrap();
    client.join("alice").await.unwrap();

    client.login_guest("bob").await.unwrap();

    assert_eq!(client.recv().await, Some(message::error("LOGIN", ErrorCode::AlreadyLoggedIn)));
    // Still connected under the first name.
    client.send_fields(&["CHAT", "hi", ""]).await.unwrap();
    assert_eq!(client.recv().await, Some(message::chat("alice", "hi", ChatKind::Public)));
}

#[tokio::test(start_paused = true)]
async fn unknown_command_is_fatal() {
    let lobby = TestLobby::start();
    let mut client = lobby.connect().await.unwrap();

    client.send_fields(&["HELLO"]).await.unwrap();

    assert_eq!(
        client.drain_until_closed().await,
        [message::error("GARBAGE_RECEIVED", ErrorCode::InvalidCmd)]
    );
}

#[tokio::test(start_paused = true)]
async fn chat_before_login_is_fatal() {
    let lobby = TestLobby::start();
    let mut client = lobby.connect().await.unwrap();

    client.send_fields(&["CHAT", "hello", ""]).await.unwrap();

    assert_eq!(
        client.drain_until_closed().await,
        [message::error("CHAT", ErrorCode::NotLoggedIn)]
    );
}

#[tokio::test(start_paused = true)]
async fn malformed_login_is_fatal() {
    let lobby = TestLobby::start();
    let mut client = lobby.connect().await.unwrap();

    client.send_fields(&["LOGIN", "0", "alice", "1.0", "maybe"]).await.unwrap();

    assert_eq!(
        client.drain_until_closed().await,
        [message::error("LOGIN", ErrorCode::MalformedPacket)]
    );
}

#[tokio::test(start_paused = true)]
async fn public_chat_reaches_everyone_and_is_sanitized() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    let mut bob = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();
    bob.join("bob").await.unwrap();
    assert_eq!(alice.recv().await, Some(message::clients_update()));

    alice.send_fields(&["CHAT", "<script>", ""]).await.unwrap();

    let expected = message::chat("alice", "&lt;script>", ChatKind::Public);
    assert_eq!(alice.recv().await, Some(expected.clone()));
    assert_eq!(bob.recv().await, Some(expected));
}

#[tokio::test(start_paused = true)]
async fn chat_too_long_to_relay_is_refused_to_sender_only() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    let mut bob = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();
    bob.join("bob").await.unwrap();
    assert_eq!(alice.recv().await, Some(message::clients_update()));

    // Fits inbound, but not once the sender name and kind are added.
    let text = "x".repeat(65_520);
    alice.send_fields(&["CHAT", text.as_str(), ""]).await.unwrap();

    assert_eq!(alice.recv().await, Some(message::error("CHAT", ErrorCode::MessageTooLong)));
    assert_eq!(bob.try_recv().await, None);
    assert_eq!(lobby.handle().client_count().await, 2);

    alice.send_fields(&["CHAT", "shorter then", ""]).await.unwrap();
    let expected = message::chat("alice", "shorter then", ChatKind::Public);
    assert_eq!(alice.recv().await, Some(expected.clone()));
    assert_eq!(bob.recv().await, Some(expected));
}

#[tokio::test(start_paused = true)]
async fn private_chat_reaches_only_receiver() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    let mut bob = lobby.connect().await.unwrap();
    let mut carol = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();
    bob.join("bob").await.unwrap();
    carol.join("carol").await.unwrap();
    while alice.try_recv().await.is_some() {}
    while bob.try_recv().await.is_some() {}

    alice.send_fields(&["CHAT", "psst", "bob"]).await.unwrap();

    assert_eq!(bob.recv().await, Some(message::chat("alice", "psst", ChatKind::Private)));
    assert_eq!(alice.try_recv().await, None);
    assert_eq!(carol.try_recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn private_chat_to_offline_user_is_silent() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();

    alice.send_fields(&["CHAT", "anyone?", "nobody"]).await.unwrap();

    assert_eq!(alice.try_recv().await, None);
    assert_eq!(lobby.handle().client_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn motd_requires_superuser() {
    let lobby = TestLobby::with_accounts(accounts());
    let mut guest = lobby.connect().await.unwrap();
    guest.join("guest").await.unwrap();

    guest.send_fields(&["MOTD", "taken over"]).await.unwrap();

    assert_eq!(guest.recv().await, Some(message::error("MOTD", ErrorCode::DeficientPermission)));
    assert_eq!(lobby.handle().motd().await, "");
    // Not fatal.
    guest.send_fields(&["PONG"]).await.unwrap();
    assert_eq!(guest.try_recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn superuser_motd_is_broadcast_and_greets_new_logins() {
    let lobby = TestLobby::with_accounts(accounts());
    let mut root = lobby.connect().await.unwrap();
    let mut guest = lobby.connect().await.unwrap();

    root.login_registered("root", "hunter2").await.unwrap();
    assert_eq!(root.recv().await, Some(message::login("root", "SUPERUSER")));
    assert_eq!(root.recv().await, Some(message::time(DEFAULT_WALL_CLOCK)));
    assert_eq!(root.recv().await, Some(message::clients_update()));
    guest.join("guest").await.unwrap();
    assert_eq!(root.recv().await, Some(message::clients_update()));

    root.send_fields(&["MOTD", "servers restart at noon"]).await.unwrap();

    let announcement = message::system_chat("servers restart at noon");
    assert_eq!(root.recv().await, Some(announcement.clone()));
    assert_eq!(guest.recv().await, Some(announcement.clone()));
    assert_eq!(lobby.handle().motd().await, "servers restart at noon");

    let mut late = lobby.connect().await.unwrap();
    late.login_guest("late").await.unwrap();
    assert_eq!(late.recv().await, Some(message::login("late", "REGULAR")));
    assert_eq!(late.recv().await, Some(message::time(DEFAULT_WALL_CLOCK)));
    assert_eq!(late.recv().await, Some(message::clients_update()));
    assert_eq!(late.recv().await, Some(announcement));
}

#[tokio::test(start_paused = true)]
async fn disconnect_announces_departure() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    let mut bob = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();
    bob.join("bob").await.unwrap();
    assert_eq!(alice.recv().await, Some(message::clients_update()));

    bob.send_fields(&["DISCONNECT", "gone fishing"]).await.unwrap();

    assert!(bob.drain_until_closed().await.is_empty());
    assert_eq!(alice.recv().await, Some(message::clients_update()));
    let names: Vec<_> = lobby.handle().clients().await.into_iter().map(|c| c.name).collect();
    assert_eq!(names, ["alice"]);
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_is_deregistered() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    let mut bob = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();
    bob.join("bob").await.unwrap();
    assert_eq!(alice.recv().await, Some(message::clients_update()));

    drop(bob);

    assert_eq!(alice.recv().await, Some(message::clients_update()));
    assert_eq!(lobby.handle().client_count().await, 1);

    // The name is free again.
    let mut again = lobby.connect().await.unwrap();
    assert_eq!(again.join("bob").await.as_deref(), Some("bob"));
}

#[tokio::test(start_paused = true)]
async fn pre_login_disconnect_is_not_announced() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    let mut lurker = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();

    lurker.send_fields(&["DISCONNECT", "never mind"]).await.unwrap();
    assert!(lurker.drain_until_closed().await.is_empty());

    assert_eq!(alice.try_recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_disconnects_every_session() {
    let lobby = TestLobby::start();
    let mut alice = lobby.connect().await.unwrap();
    let mut bob = lobby.connect().await.unwrap();
    let mut lurker = lobby.connect().await.unwrap();
    alice.join("alice").await.unwrap();
    bob.join("bob").await.unwrap();

    lobby.shutdown().await;
    assert_eq!(lobby.handle().phase(), ServerPhase::Stopped);
    assert_eq!(lobby.handle().client_count().await, 0);

    let farewell = message::disconnect(DisconnectReason::ServerShutdown);
    for client in [&mut alice, &mut bob, &mut lurker] {
        let packets = client.drain_until_closed().await;
        assert_eq!(packets.last(), Some(&farewell));
    }

    assert!(lobby.connect().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent() {
    let lobby = TestLobby::start();

    lobby.handle().shutdown();
    lobby.handle().shutdown();
    lobby.handle().stopped().await;
    lobby.shutdown().await;

    assert_eq!(lobby.handle().phase(), ServerPhase::Stopped);
}
