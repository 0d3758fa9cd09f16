//! Bounded retry with exponential backoff for transient source failures.
//!
//! The retry policy is explicit: the caller supplies the operation, the
//! transient-error predicate, and the [`RetryConfig`] bounds. Retries block
//! the current poll cycle and never spawn background work, so a retry storm
//! is self-limiting by the attempt cap and the growing delay. Both the
//! in-flight operation and the backoff sleep observe the shutdown signal, so
//! a stop request never waits out a backoff or a hung operation.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use sqlpoll_config::shared::RetryConfig;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{PollError, PollResult};

/// Runs `op` until it succeeds, fails non-transiently, exhausts
/// `config.max_attempts`, or shutdown is requested.
///
/// Only errors for which `is_retryable` returns true are retried; everything
/// else, including the last error of an exhausted retry sequence, propagates
/// to the caller unmodified. Between attempts the task sleeps for an
/// exponentially doubling, jittered backoff capped at `max_backoff_ms`.
///
/// A shutdown request interrupts both the in-flight operation and the
/// backoff sleep; the interrupted call resolves to `Ok(None)` rather than an
/// error, since cancellation is not a failure.
pub async fn with_backoff<T, F, Fut, P>(
    config: &RetryConfig,
    shutdown_rx: &mut ShutdownRx,
    is_retryable: P,
    mut op: F,
) -> PollResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PollResult<T>>,
    P: Fn(&PollError) -> bool,
{
    let max_backoff = Duration::from_millis(config.max_backoff_ms);
    let mut backoff = Duration::from_millis(config.min_backoff_ms);
    let mut attempt = 1u32;

    loop {
        let result = tokio::select! {
            result = op() => result,
            _ = shutdown_rx.wait_for_shutdown() => {
                debug!("operation interrupted by shutdown");
                return Ok(None);
            }
        };

        match result {
            Ok(value) => return Ok(Some(value)),
            Err(err) if attempt < config.max_attempts && is_retryable(&err) => {
                warn!(
                    error = %err,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "transient source failure, retrying after backoff"
                );

                tokio::select! {
                    _ = sleep(jittered(backoff, config.jitter_percent)) => {}
                    _ = shutdown_rx.wait_for_shutdown() => {
                        debug!("backoff sleep interrupted by shutdown");
                        return Ok(None);
                    }
                }

                backoff = (backoff * 2).min(max_backoff);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Applies ±`jitter_percent`% of random jitter to a backoff duration.
fn jittered(base: Duration, jitter_percent: u8) -> Duration {
    let jitter_fraction = f64::from(jitter_percent) / 100.0;
    let jitter_range = base.as_secs_f64() * jitter_fraction;
    if jitter_range == 0.0 {
        return base;
    }

    let mut rng = rand::thread_rng();
    let jitter = rng.gen_range(-jitter_range..=jitter_range);

    Duration::from_secs_f64((base.as_secs_f64() + jitter).max(0.0))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::timeout;

    use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
    use crate::error::ErrorKind;
    use crate::poll_error;

    use super::*;

    // The transmitter must stay alive: a dropped transmitter reads as a
    // shutdown request.
    fn running() -> (ShutdownTx, ShutdownRx) {
        create_shutdown_channel()
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            min_backoff_ms: 1,
            max_backoff_ms: 4,
            jitter_percent: 0,
        }
    }

    fn transient() -> PollError {
        poll_error!(ErrorKind::SourceConnectionFailed, "connection dropped")
    }

    fn permanent() -> PollError {
        poll_error!(ErrorKind::SourceQueryFailed, "malformed query")
    }

    fn retry_on_kind(err: &PollError) -> bool {
        err.kind().retryable()
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let (_tx, mut rx) = running();
        let calls = AtomicU32::new(0);

        let result = with_backoff(&fast_config(2), &mut rx, retry_on_kind, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;

        assert_eq!(result.unwrap(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_once_then_success() {
        let (_tx, mut rx) = running();
        let calls = AtomicU32::new(0);

        let result = with_backoff(&fast_config(2), &mut rx, retry_on_kind, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(transient())
            } else {
                Ok("row")
            }
        })
        .await;

        assert_eq!(result.unwrap(), Some("row"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_continuous_transient_failure_exhausts_attempts() {
        let (_tx, mut rx) = running();
        let calls = AtomicU32::new(0);

        let result: PollResult<Option<()>> =
            with_backoff(&fast_config(3), &mut rx, retry_on_kind, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceConnectionFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let (_tx, mut rx) = running();
        let calls = AtomicU32::new(0);

        let result: PollResult<Option<()>> =
            with_backoff(&fast_config(5), &mut rx, retry_on_kind, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(permanent())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_backoff_sleep() {
        // A one minute backoff would hang the test if it were not
        // interruptible.
        let config = RetryConfig {
            max_attempts: 2,
            min_backoff_ms: 60_000,
            max_backoff_ms: 120_000,
            jitter_percent: 0,
        };
        let (tx, mut rx) = running();
        let calls = AtomicU32::new(0);

        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            let _ = tx.shutdown();
        });

        let result = timeout(
            Duration::from_secs(5),
            with_backoff(&config, &mut rx, retry_on_kind, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(transient())
            }),
        )
        .await
        .expect("shutdown should interrupt the backoff sleep promptly");

        assert_eq!(result.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_in_flight_operation() {
        let (tx, mut rx) = running();
        tx.shutdown().unwrap();

        // The operation never resolves; only the shutdown signal can end it.
        let result = timeout(
            Duration::from_secs(5),
            with_backoff(&fast_config(2), &mut rx, retry_on_kind, || {
                std::future::pending::<PollResult<()>>()
            }),
        )
        .await
        .expect("shutdown should interrupt a hung operation promptly");

        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_jittered_backoff_within_bounds() {
        let base = Duration::from_secs(10);
        for _ in 0..100 {
            let jittered = jittered(base, 25);
            // With 25% jitter the result stays between 7.5 and 12.5 seconds.
            assert!(jittered >= Duration::from_secs_f64(7.5));
            assert!(jittered <= Duration::from_secs_f64(12.5));
        }
    }

    #[test]
    fn test_zero_jitter_is_identity() {
        let base = Duration::from_millis(500);
        assert_eq!(jittered(base, 0), base);
    }
}
