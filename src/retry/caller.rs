//! Rate-limited caller
//!
//! Runs one outbound operation through the shared throttle and retries it
//! with exponential backoff while the upstream keeps answering 429.

use super::error::{RetryError, UpstreamError};
use super::jitter::{JitterSource, ThreadRngJitter};
use super::policy::RetryPolicy;
use super::throttle::ThrottleState;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Executes outbound operations under a shared throttle and retry policy
#[derive(Clone, Debug)]
pub struct RateLimitedCaller {
    throttle: ThrottleState,
    jitter: Arc<dyn JitterSource>,
}

impl RateLimitedCaller {
    /// Create a caller pacing against `throttle`
    pub fn new(throttle: ThrottleState) -> Self {
        Self {
            throttle,
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    /// Replace the jitter source
    #[must_use]
    pub fn with_jitter(mut self, jitter: impl JitterSource + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// The shared throttle this caller paces against
    pub fn throttle(&self) -> &ThrottleState {
        &self.throttle
    }

    /// Run `operation` until it succeeds, fails with a non-rate-limit error,
    /// or exhausts `policy.max_retries`.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: F,
        policy: &RetryPolicy,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        self.execute_with_cancel(operation, policy, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but aborts with
    /// [`RetryError::Cancelled`] if `cancel` fires during a throttle or
    /// backoff wait.
    pub async fn execute_with_cancel<T, F, Fut>(
        &self,
        mut operation: F,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut retries = 0u32;
        let mut attempts = 0u32;

        loop {
            if self
                .throttle
                .wait_turn(policy.min_interval, cancel)
                .await
                .is_none()
            {
                debug!(attempts, "Cancelled while throttled");
                return Err(RetryError::Cancelled { attempts });
            }

            attempts += 1;
            debug!(attempt = attempts, "Dispatching outbound call");

            match operation().await {
                Ok(value) => {
                    self.throttle.mark_success();
                    return Ok(value);
                }
                Err(UpstreamError::RateLimited {
                    retry_after,
                    message,
                }) => {
                    retries += 1;
                    if retries > policy.max_retries {
                        warn!(attempts, "Rate limit persisted, giving up");
                        return Err(RetryError::RateLimitExhausted { attempts, message });
                    }

                    let delay = policy.backoff_delay(retries, self.jitter.as_ref());
                    warn!(
                        "Rate limited (429), retry {}/{}, waiting {:?}{}",
                        retries,
                        policy.max_retries,
                        delay,
                        retry_after
                            .map(|hint| format!(" (server suggested {hint:?})"))
                            .unwrap_or_default()
                    );

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            debug!(attempts, "Cancelled during backoff");
                            return Err(RetryError::Cancelled { attempts });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(UpstreamError::Other { status, message }) => {
                    debug!(?status, "Non-retryable upstream failure");
                    return Err(RetryError::Propagated { status, message });
                }
            }
        }
    }
}

impl Default for RateLimitedCaller {
    fn default() -> Self {
        Self::new(ThrottleState::new())
    }
}
