//! Simulated environment for deterministic tests.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use metalobby_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall-clock seconds a fresh [`SimEnv`] starts at (2023-11-14T22:13:20Z).
pub const DEFAULT_WALL_CLOCK: u64 = 1_700_000_000;

/// Environment with a seeded RNG and a wall clock that only moves when told.
///
/// Clones share both the RNG stream and the clock.
#[derive(Debug, Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    wall_clock: Arc<AtomicU64>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment whose random stream is fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            wall_clock: Arc::new(AtomicU64::new(DEFAULT_WALL_CLOCK)),
        }
    }

    /// Set the wall clock.
    pub fn set_wall_clock(&self, secs: u64) {
        self.wall_clock.store(secs, Ordering::SeqCst);
    }

    /// Move the wall clock forward.
    pub fn advance_wall_clock(&self, secs: u64) {
        self.wall_clock.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    fn wall_clock_secs(&self) -> u64 {
        self.wall_clock.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
