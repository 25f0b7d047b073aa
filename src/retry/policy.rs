//! Retry policy and backoff computation

use super::jitter::JitterSource;
use std::time::Duration;

/// Retry and pacing settings for one `execute` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Minimum spacing between dispatches on a shared throttle
    pub min_interval: Duration,
    /// Delay before the first retry; doubles on each subsequent retry
    pub backoff_base: Duration,
    /// Upper bound of the random delay added to each backoff
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_interval: Duration::from_millis(4000),
            backoff_base: Duration::from_millis(1000),
            jitter_max: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Create a new policy
    pub fn new(
        max_retries: u32,
        min_interval: Duration,
        backoff_base: Duration,
        jitter_max: Duration,
    ) -> Self {
        Self {
            max_retries,
            min_interval,
            backoff_base,
            jitter_max,
        }
    }

    /// A policy with no retries, no pacing and no jitter
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    #[must_use]
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    #[must_use]
    pub fn with_jitter_max(mut self, jitter_max: Duration) -> Self {
        self.jitter_max = jitter_max;
        self
    }

    /// Non-jittered backoff for the given retry number (1-based).
    ///
    /// `backoff_base * 2^(retry - 1)`, saturating at `Duration::MAX`.
    pub fn base_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.backoff_base.saturating_mul(factor)
    }

    /// Full backoff for the given retry number, jitter included
    pub fn backoff_delay(&self, retry: u32, jitter: &dyn JitterSource) -> Duration {
        self.base_delay(retry)
            .saturating_add(jitter.sample(self.jitter_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::jitter::{NoJitter, SeededJitter};

    #[test]
    fn test_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.min_interval, Duration::from_secs(4));
        assert_eq!(policy.backoff_base, Duration::from_secs(1));
    }

    #[test]
    fn test_policy_builder() {
        let policy = RetryPolicy::no_retry()
            .with_max_retries(5)
            .with_min_interval(Duration::from_millis(10))
            .with_backoff_base(Duration::from_millis(20))
            .with_jitter_max(Duration::from_millis(30));

        assert_eq!(
            policy,
            RetryPolicy::new(
                5,
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(30)
            )
        );
    }

    #[test]
    fn test_base_delay_doubles() {
        let policy = RetryPolicy::default().with_backoff_base(Duration::from_millis(1000));
        let delays: Vec<u128> = (1..=4).map(|r| policy.base_delay(r).as_millis()).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000]);
        assert_eq!(policy.base_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_base_delay_saturates() {
        let policy = RetryPolicy::default().with_backoff_base(Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.base_delay(40), Duration::MAX);
    }

    #[test]
    fn test_backoff_jitter_is_additive() {
        let policy = RetryPolicy::default()
            .with_backoff_base(Duration::from_millis(100))
            .with_jitter_max(Duration::from_millis(50));
        let jitter = SeededJitter::new(7);

        for retry in 1..=5 {
            let delay = policy.backoff_delay(retry, &jitter);
            let base = policy.base_delay(retry);
            assert!(delay >= base);
            assert!(delay <= base + Duration::from_millis(50));
        }

        assert_eq!(
            policy.backoff_delay(3, &NoJitter),
            Duration::from_millis(400)
        );
    }
}
