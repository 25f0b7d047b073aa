//! Upstream HTTP module
//!
//! Provides the client for the generative-language API.
//!
//! # Features
//!
//! - **Boundary Classification**: Every failure becomes an `UpstreamError`
//! - **Key Hiding**: The API key travels in a header and is redacted from logs
//! - **Quota Guard**: Optional token bucket rate limiter using governor

mod client;
mod rate_limit;

pub use client::{
    GenerativeClient, GenerativeClientConfig, Generator, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use rate_limit::{QuotaTier, RateLimiter, RateLimiterConfig};
