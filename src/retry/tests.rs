//! Tests for the retry module

use super::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

/// Records the instant of every attempt
#[derive(Clone, Default)]
struct Recorder {
    hits: Arc<Mutex<Vec<Instant>>>,
}

impl Recorder {
    fn hit(&self) -> usize {
        let mut hits = self.hits.lock().unwrap();
        hits.push(Instant::now());
        hits.len()
    }

    fn count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }

    fn times(&self) -> Vec<Instant> {
        self.hits.lock().unwrap().clone()
    }
}

fn rate_limited() -> UpstreamError {
    UpstreamError::classify(Some(429), "Resource has been exhausted (e.g. check quota).")
}

fn caller() -> RateLimitedCaller {
    RateLimitedCaller::new(ThrottleState::new()).with_jitter(NoJitter)
}

/// Paused-clock timers resolve to the millisecond
fn assert_gap(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected gap of ~{expected:?}, got {actual:?}"
    );
}

fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|w| w[1] - w[0]).collect()
}

#[tokio::test(start_paused = true)]
async fn test_non_rate_limit_error_is_not_retried() {
    let rec = Recorder::default();
    let policy = RetryPolicy::default().with_max_retries(5);
    let start = Instant::now();

    let result = caller()
        .execute(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Err::<(), _>(UpstreamError::classify(Some(500), "Internal error"))
                }
            },
            &policy,
        )
        .await;

    let err = assert_err!(result);
    assert_eq!(
        err,
        RetryError::Propagated {
            status: Some(500),
            message: "Internal error".to_string(),
        }
    );
    assert_eq!(rec.count(), 1);
    assert_eq!(Instant::now(), start);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retries_are_bounded() {
    for max_retries in [0, 1, 4] {
        let rec = Recorder::default();
        let policy = RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_min_interval(Duration::ZERO)
            .with_backoff_base(Duration::from_millis(10));

        let result = caller()
            .execute(
                || {
                    let rec = rec.clone();
                    async move {
                        rec.hit();
                        Err::<(), _>(rate_limited())
                    }
                },
                &policy,
            )
            .await;

        let err = assert_err!(result);
        assert!(err.is_quota_exhausted());
        assert_eq!(rec.count(), max_retries as usize + 1);
        assert!(matches!(
            err,
            RetryError::RateLimitExhausted { attempts, .. } if attempts == max_retries + 1
        ));
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_fails_on_first_rate_limit() {
    let rec = Recorder::default();

    let result = caller()
        .execute(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Err::<(), _>(UpstreamError::classify(None, "got HTTP 429 from upstream"))
                }
            },
            &RetryPolicy::no_retry(),
        )
        .await;

    assert!(assert_err!(result).is_quota_exhausted());
    assert_eq!(rec.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_eventual_success_after_rate_limits() {
    let rec = Recorder::default();
    let policy = RetryPolicy::default()
        .with_max_retries(3)
        .with_min_interval(Duration::ZERO);

    let result = caller()
        .execute(
            || {
                let rec = rec.clone();
                async move {
                    if rec.hit() <= 2 {
                        Err(rate_limited())
                    } else {
                        Ok("definitions")
                    }
                }
            },
            &policy,
        )
        .await;

    assert_eq!(assert_ok!(result), "definitions");
    assert_eq!(rec.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_waits_double() {
    let rec = Recorder::default();
    let policy = RetryPolicy::new(
        2,
        Duration::ZERO,
        Duration::from_millis(1000),
        Duration::ZERO,
    );

    let result = caller()
        .execute(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Err::<(), _>(rate_limited())
                }
            },
            &policy,
        )
        .await;

    assert!(assert_err!(result).is_quota_exhausted());
    let gaps = gaps(&rec.times());
    assert_eq!(gaps.len(), 2);
    assert_gap(gaps[0], Duration::from_millis(1000));
    assert_gap(gaps[1], Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_growth_is_non_decreasing() {
    let rec = Recorder::default();
    let policy = RetryPolicy::new(
        5,
        Duration::ZERO,
        Duration::from_millis(1000),
        Duration::ZERO,
    );

    let _ = caller()
        .execute(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Err::<(), _>(rate_limited())
                }
            },
            &policy,
        )
        .await;

    let gaps = gaps(&rec.times());
    assert_eq!(gaps.len(), 5);
    assert!(gaps.windows(2).all(|w| w[0] <= w[1]));
    assert_gap(gaps[4], Duration::from_millis(16_000));
}

#[tokio::test(start_paused = true)]
async fn test_jitter_is_added_to_backoff() {
    let rec = Recorder::default();
    let policy = RetryPolicy::new(
        3,
        Duration::ZERO,
        Duration::from_millis(1000),
        Duration::from_millis(500),
    );
    let caller = RateLimitedCaller::new(ThrottleState::new()).with_jitter(SeededJitter::new(9));

    let _ = caller
        .execute(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Err::<(), _>(rate_limited())
                }
            },
            &policy,
        )
        .await;

    for (retry, gap) in (1..).zip(gaps(&rec.times())) {
        let base = policy.base_delay(retry);
        assert!(gap >= base, "retry {retry}: {gap:?} < {base:?}");
        assert!(gap <= base + Duration::from_millis(505));
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_respect_min_interval() {
    let caller = caller();
    let rec = Recorder::default();
    let policy = RetryPolicy::default().with_min_interval(Duration::from_millis(4000));

    let op = || {
        let rec = rec.clone();
        async move {
            rec.hit();
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, UpstreamError>(())
        }
    };

    let (a, b) =
        futures::future::join(caller.execute(op, &policy), caller.execute(op, &policy)).await;
    assert_ok!(a);
    assert_ok!(b);

    let gaps = gaps(&rec.times());
    assert_eq!(gaps.len(), 1);
    assert!(gaps[0] >= Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_spawned_callers_are_serialized() {
    let caller = caller();
    let rec = Recorder::default();
    let policy = RetryPolicy::default().with_min_interval(Duration::from_millis(250));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let caller = caller.clone();
            let rec = rec.clone();
            let policy = policy.clone();
            tokio::spawn(async move {
                caller
                    .execute(
                        || {
                            let rec = rec.clone();
                            async move {
                                rec.hit();
                                Ok::<_, UpstreamError>(())
                            }
                        },
                        &policy,
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let mut times = rec.times();
    times.sort();
    assert_eq!(times.len(), 5);
    assert!(gaps(&times)
        .iter()
        .all(|gap| *gap >= Duration::from_millis(250)));
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_calls_are_paced() {
    let caller = caller();
    let rec = Recorder::default();
    let policy = RetryPolicy::default()
        .with_max_retries(3)
        .with_min_interval(Duration::from_millis(4000));

    for _ in 0..2 {
        let rec = rec.clone();
        let result = caller
            .execute(
                move || {
                    let rec = rec.clone();
                    async move {
                        rec.hit();
                        Ok::<_, UpstreamError>("ok")
                    }
                },
                &policy,
            )
            .await;
        assert_ok!(result);
    }

    assert_gap(gaps(&rec.times())[0], Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_throttle_is_rechecked_after_backoff() {
    let rec = Recorder::default();
    let policy = RetryPolicy::new(
        1,
        Duration::from_millis(4000),
        Duration::from_millis(1000),
        Duration::ZERO,
    );

    let result = caller()
        .execute(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Err::<(), _>(rate_limited())
                }
            },
            &policy,
        )
        .await;

    assert!(assert_err!(result).is_quota_exhausted());
    // 1s backoff, then the remaining 3s of the throttle interval
    assert_gap(gaps(&rec.times())[0], Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_retrying() {
    let rec = Recorder::default();
    let token = CancellationToken::new();
    let policy = RetryPolicy::new(5, Duration::ZERO, Duration::from_secs(10), Duration::ZERO);

    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let result = caller()
        .execute_with_cancel(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Err::<(), _>(rate_limited())
                }
            },
            &policy,
            &token,
        )
        .await;

    assert_eq!(assert_err!(result), RetryError::Cancelled { attempts: 1 });
    assert_eq!(rec.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_dispatch() {
    let rec = Recorder::default();
    let token = CancellationToken::new();
    token.cancel();

    let result = caller()
        .execute_with_cancel(
            || {
                let rec = rec.clone();
                async move {
                    rec.hit();
                    Ok::<_, UpstreamError>(())
                }
            },
            &RetryPolicy::default(),
            &token,
        )
        .await;

    let err = assert_err!(result);
    assert!(err.is_cancelled());
    assert_eq!(rec.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_independent_throttles_do_not_interfere() {
    let a = caller();
    let b = caller();
    let policy = RetryPolicy::default().with_min_interval(Duration::from_secs(60));
    let start = Instant::now();

    let op = || async { Ok::<_, UpstreamError>(()) };
    assert_ok!(a.execute(op, &policy).await);
    assert_ok!(b.execute(op, &policy).await);

    assert_eq!(Instant::now(), start);
    assert!(a.throttle().last_dispatch().is_some());
}
