//! Seeded random source shared by an engine's ticks.
//!
//! Engines never call a global RNG: each owns a `SimRng`, seeded from
//! `SIMULATION_SEED` when set so runs can be replayed.

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

pub struct SimRng {
    inner: Mutex<SmallRng>,
}

impl SimRng {
    /// `stream` separates engines sharing one configured seed.
    pub fn new(seed: Option<u64>, stream: u64) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(stream)),
            None => SmallRng::from_os_rng(),
        };
        Self {
            inner: Mutex::new(rng),
        }
    }

    /// Runs `f` with exclusive access to the generator.
    pub fn with<R>(&self, f: impl FnOnce(&mut SmallRng) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn id(&self) -> Uuid {
        random_id(&mut self.inner.lock())
    }

    /// Uniform draw in `[0, 1)`.
    pub fn draw(&self) -> f64 {
        self.inner.lock().random::<f64>()
    }
}

/// Version 4 id drawn from `rng`, so seeded runs produce the same ids.
pub fn random_id(rng: &mut SmallRng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}

/// Picks one element from a constant, non-empty table.
pub fn pick<'a, T>(rng: &mut SmallRng, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Clamps to `[0, 1]`, mapping non-finite values to 0.
pub fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
