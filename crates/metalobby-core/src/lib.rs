//! Protocol logic for the metalobby server, free of I/O.
//!
//! Everything here is a plain state machine or a pure function: the runtime in
//! `metalobby-server` owns sockets, timers and locks, and consults these types
//! to decide what a session is allowed to do next.
//!
//! - [`session`]: lifecycle state (`Unauthenticated` → `Connected` →
//!   `Disconnected`) and identity of one client
//! - [`keepalive`]: the idle-timeout / ping-cycle handshake
//! - [`credentials`]: account lookup used by `LOGIN`
//! - [`naming`]: deterministic guest name collision resolution
//! - [`env`]: wall clock and randomness behind a trait for deterministic tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod env;
pub mod error;
pub mod keepalive;
pub mod naming;
pub mod session;

pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use env::Environment;
pub use error::SessionError;
pub use keepalive::{Keepalive, KeepaliveConfig, PingOutcome};
pub use naming::resolve_guest_name;
pub use session::{Permissions, Session, SessionState};
