//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system resources (wall clock, randomness).
//! Production uses the real clock and OS entropy; the test harness swaps in a
//! settable clock and a seeded RNG so `TIME` replies and session ids are
//! reproducible.
//!
//! Timer deadlines are not part of this trait: the runtime drives them with
//! `tokio::time`, which tests control by pausing the clock.

/// Abstract environment providing wall-clock time and randomness.
///
/// # Invariants
///
/// - `wall_clock_secs()` is seconds since the Unix epoch
/// - Given the same seed, `random_bytes()` produces the same sequence
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time in seconds since the Unix epoch.
    ///
    /// Used for login timestamps and the `TIME` reply.
    fn wall_clock_secs(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for session ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
