//! Deterministic test harness for the metalobby server.
//!
//! Runs the real coordinator and session tasks over in-memory duplex streams,
//! with a seeded RNG and a settable wall clock. Combined with tokio's paused
//! clock (`#[tokio::test(start_paused = true)]`) every timer, session id and
//! `TIME` reply is reproducible.
//!
//! # Components
//!
//! - [`SimEnv`]: seeded randomness and a manually driven wall clock
//! - [`TestLobby`]: a running server fed by in-memory connections
//! - [`TestClient`]: one framed client connection with typed helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod sim_env;

pub use client::{TestClient, TestLobby};
pub use sim_env::SimEnv;
