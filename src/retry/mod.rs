//! Rate-limited retry scheduling for outbound calls
//!
//! Wraps a single outbound call with two independent disciplines:
//!
//! - **Pacing**: a [`ThrottleState`] shared by every caller of one target keeps
//!   dispatches at least `min_interval` apart, even under concurrency
//! - **Backoff**: rate-limit failures (429) are retried with exponential
//!   backoff plus additive jitter, up to `max_retries`
//!
//! Every other failure propagates on first occurrence.
//!
//! ```rust,ignore
//! use vocab_relay::retry::{RateLimitedCaller, RetryPolicy, ThrottleState, UpstreamError};
//!
//! let caller = RateLimitedCaller::new(ThrottleState::new());
//! let text = caller
//!     .execute(|| async { client.call("prompt").await }, &RetryPolicy::default())
//!     .await?;
//! ```

mod caller;
mod error;
mod jitter;
mod policy;
mod throttle;

pub use caller::RateLimitedCaller;
pub use error::{RetryError, UpstreamError};
pub use jitter::{JitterSource, NoJitter, SeededJitter, ThreadRngJitter};
pub use policy::RetryPolicy;
pub use throttle::ThrottleState;

#[cfg(test)]
mod tests;
