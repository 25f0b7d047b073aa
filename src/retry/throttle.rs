//! Shared minimum-interval throttle
//!
//! A `ThrottleState` is a cheap cloneable handle. Every clone paces against the
//! same timestamp, so one handle per downstream target is enough to keep all
//! concurrent callers of that target spaced out.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Pacing state shared by every caller of one downstream target
#[derive(Clone, Default)]
pub struct ThrottleState {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Serializes the check-wait-record sequence across callers
    gate: tokio::sync::Mutex<()>,
    /// Most recent dispatch or completion, whichever is later
    last_dispatch: Mutex<Option<Instant>>,
}

impl ThrottleState {
    /// Create a fresh throttle with no recorded dispatch
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the most recent dispatch, if any
    pub fn last_dispatch(&self) -> Option<Instant> {
        *self.lock_last()
    }

    /// Wait for this caller's turn to dispatch, then record the dispatch.
    ///
    /// Returns the dispatch instant, or `None` if `cancel` fired first. A
    /// cancelled wait leaves the recorded timestamp untouched.
    pub(crate) async fn wait_turn(
        &self,
        min_interval: Duration,
        cancel: &CancellationToken,
    ) -> Option<Instant> {
        if cancel.is_cancelled() {
            return None;
        }

        let _gate = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            guard = self.inner.gate.lock() => guard,
        };

        // A completion may push the timestamp forward while we sleep, so
        // re-check until the interval has really elapsed.
        loop {
            let wait = self.remaining(min_interval);
            if wait.is_zero() {
                break;
            }
            debug!(wait_ms = wait.as_millis() as u64, "Throttling outbound call");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                () = tokio::time::sleep(wait) => {}
            }
        }

        Some(self.record(Instant::now()))
    }

    /// Record a successful completion
    pub(crate) fn mark_success(&self) {
        self.record(Instant::now());
    }

    fn remaining(&self, min_interval: Duration) -> Duration {
        match *self.lock_last() {
            Some(last) => {
                let elapsed = Instant::now().saturating_duration_since(last);
                min_interval.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// Store `at` unless a later timestamp is already recorded
    fn record(&self, at: Instant) -> Instant {
        let mut last = self.lock_last();
        let next = last.map_or(at, |prev| prev.max(at));
        *last = Some(next);
        at
    }

    fn lock_last(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.inner
            .last_dispatch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ThrottleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleState")
            .field("last_dispatch", &self.last_dispatch())
            .finish()
    }
}
