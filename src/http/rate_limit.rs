//! Request quota limiting
//!
//! Uses the governor crate for token bucket rate limiting. Generative APIs
//! publish their quotas per minute, so that is the unit configured here.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per minute
    pub requests_per_minute: u32,
    /// Burst size (max tokens in bucket)
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_burst() -> u32 {
    1
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(requests_per_minute: u32, burst_size: u32) -> Self {
        Self {
            requests_per_minute,
            burst_size,
        }
    }

    /// Free-tier quota (15 rpm, no burst)
    pub fn free_tier() -> Self {
        Self {
            requests_per_minute: 15,
            burst_size: 1,
        }
    }

    /// Pay-as-you-go quota (1000 rpm)
    pub fn paid_tier() -> Self {
        Self {
            requests_per_minute: 1000,
            burst_size: 10,
        }
    }
}

/// Published quota tiers, selectable by name in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaTier {
    Free,
    Paid,
}

impl QuotaTier {
    /// Limiter settings for this tier
    pub fn limits(self) -> RateLimiterConfig {
        match self {
            QuotaTier::Free => RateLimiterConfig::free_tier(),
            QuotaTier::Paid => RateLimiterConfig::paid_tier(),
        }
    }
}

/// Token bucket rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(Governor::direct(quota)),
        }
    }

    /// Wait until a request can be made
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_rate_limiter_config_presets() {
        let free = QuotaTier::Free.limits();
        assert_eq!(free.requests_per_minute, 15);
        assert_eq!(free.burst_size, 1);

        let paid = QuotaTier::Paid.limits();
        assert_eq!(paid.requests_per_minute, 1000);
        assert_eq!(paid.burst_size, 10);
    }

    #[test]
    fn test_rate_limiter_config_deserialize_default_burst() {
        let config: RateLimiterConfig =
            serde_yaml::from_str("requests_per_minute: 60").unwrap();
        assert_eq!(config, RateLimiterConfig::new(60, 1));
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_burst() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(60, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_rate_limiter_zero_quota_falls_back_to_one() {
        let limiter = RateLimiter::new(&RateLimiterConfig::new(0, 0));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_quota_tier_names() {
        let tier: QuotaTier = serde_yaml::from_str("paid").unwrap();
        assert_eq!(tier, QuotaTier::Paid);
        assert!(serde_yaml::from_str::<QuotaTier>("enterprise").is_err());
    }
}
