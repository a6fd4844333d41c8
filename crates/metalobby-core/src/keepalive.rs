//! Keepalive handshake.
//!
//! Two independent clocks guard every session:
//!
//! - the send timeout bounds total silence from the client; any packet
//!   re-arms it
//! - the ping cycle actively probes; each expiry either sends `PING` or, if the
//!   previous `PING` is still unanswered, declares the peer dead
//!
//! This module holds the decision logic only. The runtime owns the actual
//! timers and calls in here when one fires or a packet arrives.

use std::time::Duration;

/// Default time a client may stay silent before it is disconnected.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between liveness probes.
pub const DEFAULT_PING_CYCLE: Duration = Duration::from_secs(15);

/// Keepalive timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    /// Silence allowed before `DISCONNECT CLIENT_TIMEOUT`
    pub send_timeout: Duration,
    /// Interval between `PING`s
    pub ping_cycle: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self { send_timeout: DEFAULT_SEND_TIMEOUT, ping_cycle: DEFAULT_PING_CYCLE }
    }
}

/// What to do when the ping cycle expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    /// Send `PING` and re-arm the cycle
    SendPing,
    /// Previous `PING` went unanswered for a full cycle
    Expired,
}

/// Ping/pong handshake state for one session.
///
/// # Invariants
///
/// - Two consecutive ping cycles without any inbound packet yield
///   `Expired`; one never does.
#[derive(Debug, Clone, Default)]
pub struct Keepalive {
    awaiting_pong: bool,
}

impl Keepalive {
    /// Create keepalive state with no ping outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a `PING` has been sent and nothing has arrived since.
    pub fn awaiting_pong(&self) -> bool {
        self.awaiting_pong
    }

    /// Any inbound packet proves liveness.
    pub fn on_packet(&mut self) {
        self.awaiting_pong = false;
    }

    /// Ping cycle expired.
    pub fn on_ping_cycle(&mut self) -> PingOutcome {
        if self.awaiting_pong {
            PingOutcome::Expired
        } else {
            self.awaiting_pong = true;
            PingOutcome::SendPing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = KeepaliveConfig::default();
        assert_eq!(config.send_timeout, Duration::from_secs(30));
        assert_eq!(config.ping_cycle, Duration::from_secs(15));
    }

    #[test]
    fn first_cycle_pings_second_expires() {
        let mut keepalive = Keepalive::new();

        assert_eq!(keepalive.on_ping_cycle(), PingOutcome::SendPing);
        assert!(keepalive.awaiting_pong());
        assert_eq!(keepalive.on_ping_cycle(), PingOutcome::Expired);
    }

    #[test]
    fn packet_between_cycles_keeps_session_alive() {
        let mut keepalive = Keepalive::new();

        assert_eq!(keepalive.on_ping_cycle(), PingOutcome::SendPing);
        keepalive.on_packet();
        assert!(!keepalive.awaiting_pong());
        assert_eq!(keepalive.on_ping_cycle(), PingOutcome::SendPing);
    }

    #[test]
    fn packet_without_outstanding_ping_is_noop() {
        let mut keepalive = Keepalive::new();
        keepalive.on_packet();
        assert!(!keepalive.awaiting_pong());
        assert_eq!(keepalive.on_ping_cycle(), PingOutcome::SendPing);
    }
}
