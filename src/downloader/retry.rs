//! Per-transfer retry loop.
//!
//! Each retry re-runs the whole transfer, so a partially written file is
//! resumed rather than fetched again. The wait between attempts follows
//! reqwest-retry's exponential backoff policy.

use crate::error::{Error, Result};

use reqwest_retry::{policies::ExponentialBackoff, RetryDecision, RetryPolicy};
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shortest wait between two attempts.
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Longest wait between two attempts.
pub const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Runs `attempt` until it succeeds, is cancelled, or `retries` retries have
/// failed.
///
/// `attempt` receives the 1-based attempt number. Returns the last outcome
/// together with the number of attempts made. Cancellation errors are never
/// retried, and cancellation during a wait ends the loop with
/// [`Error::Cancelled`].
pub(crate) async fn with_retries<T, F, Fut>(
    retries: u32,
    cancel: &CancellationToken,
    mut attempt: F,
) -> (Result<T>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let policy = ExponentialBackoff::builder()
        .retry_bounds(MIN_RETRY_INTERVAL, MAX_RETRY_INTERVAL)
        .build_with_max_retries(retries);
    let started = SystemTime::now();
    let mut past_retries = 0;

    loop {
        let attempts = past_retries + 1;
        let err = match attempt(attempts).await {
            Ok(value) => return (Ok(value), attempts),
            Err(e) if e.is_cancellation() => return (Err(e), attempts),
            Err(e) => e,
        };

        let execute_after = match policy.should_retry(started, past_retries) {
            RetryDecision::Retry { execute_after } => execute_after,
            RetryDecision::DoNotRetry => {
                debug!("Giving up after {} attempt(s)", attempts);
                return (Err(err), attempts);
            }
        };

        let delay = execute_after
            .duration_since(SystemTime::now())
            .unwrap_or_default();
        warn!(
            "Attempt {} failed: {}. Retrying in {:?}",
            attempts, err, delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return (Err(Error::Cancelled), attempts),
            _ = sleep(delay) => {}
        }
        past_retries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_no_retries_means_one_attempt() {
        let (res, attempts) = with_retries(0, &CancellationToken::new(), |_| async {
            Err::<(), _>(Error::Internal("nope".into()))
        })
        .await;
        assert!(matches!(res, Err(Error::Internal(_))));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let (res, attempts) = with_retries(3, &CancellationToken::new(), |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(Error::Internal(format!("attempt {n}")))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(res.unwrap(), 3);
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let (res, attempts) = with_retries(1, &CancellationToken::new(), |_| async {
            Err::<(), _>(Error::Internal("still down".into()))
        })
        .await;
        assert!(res.is_err());
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_cancellation_is_not_retried() {
        let (res, attempts) = with_retries(5, &CancellationToken::new(), |_| async {
            Err::<(), _>(Error::Cancelled)
        })
        .await;
        assert!(matches!(res, Err(Error::Cancelled)));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (res, attempts) = with_retries(5, &cancel, move |_| {
            token.cancel();
            async { Err::<(), _>(Error::Internal("down".into())) }
        })
        .await;
        assert!(matches!(res, Err(Error::Cancelled)));
        assert_eq!(attempts, 1);
    }
}
