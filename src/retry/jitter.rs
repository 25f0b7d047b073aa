//! Randomness sources for backoff jitter

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Produces a random delay in `[0, max]`
pub trait JitterSource: Send + Sync + Debug {
    fn sample(&self, max: Duration) -> Duration;
}

/// Thread-local RNG, the default for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn sample(&self, max: Duration) -> Duration {
        sample_with(&mut rand::thread_rng(), max)
    }
}

/// Deterministic RNG seeded up front
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededJitter {
    fn sample(&self, max: Duration) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        sample_with(&mut *rng, max)
    }
}

/// Always zero
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn sample(&self, _max: Duration) -> Duration {
        Duration::ZERO
    }
}

fn sample_with<R: Rng + ?Sized>(rng: &mut R, max: Duration) -> Duration {
    let max_micros = max.as_micros() as u64;
    if max_micros == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rng.gen_range(0..=max_micros))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_stay_in_range() {
        let max = Duration::from_millis(250);
        for _ in 0..200 {
            assert!(ThreadRngJitter.sample(max) <= max);
        }
    }

    #[test]
    fn test_zero_max() {
        assert_eq!(ThreadRngJitter.sample(Duration::ZERO), Duration::ZERO);
        assert_eq!(SeededJitter::new(1).sample(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let max = Duration::from_secs(1);
        let a = SeededJitter::new(42);
        let b = SeededJitter::new(42);
        let first: Vec<_> = (0..5).map(|_| a.sample(max)).collect();
        let second: Vec<_> = (0..5).map(|_| b.sample(max)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_jitter() {
        assert_eq!(NoJitter.sample(Duration::from_secs(10)), Duration::ZERO);
    }
}
