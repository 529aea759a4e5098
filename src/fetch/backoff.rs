//! Exponential backoff with jitter.

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lower bound of the jitter factor
pub const JITTER_MIN: f64 = 0.8;
/// Upper bound of the jitter factor
pub const JITTER_MAX: f64 = 1.2;

/// Un-jittered delay after the failed attempt with index `attempt` (0-based):
/// `min(base_ms * 2^attempt, max_ms)`.
pub fn exponential_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

/// Scales `delay_ms` by `factor`, truncating to whole milliseconds.
pub fn apply_jitter(delay_ms: u64, factor: f64) -> u64 {
    (delay_ms as f64 * factor).floor() as u64
}

// == Jitter Source ==
/// Seedable source of jitter factors in `[JITTER_MIN, JITTER_MAX]`.
///
/// The generator is locked only while a sample is drawn.
#[derive(Debug)]
pub struct Jitter {
    rng: Mutex<StdRng>,
}

impl Jitter {
    /// Seeds from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draws the next factor.
    pub fn factor(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(JITTER_MIN..=JITTER_MAX)
    }

    /// Jittered backoff after the failed attempt with index `attempt`.
    pub fn backoff(&self, attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
        let delay = exponential_delay_ms(attempt, base_ms, max_ms);
        Duration::from_millis(apply_jitter(delay, self.factor()))
    }
}
