//! Retry and cancellation helpers
//!
//! Backoff schedules come from the `backon` crate. Every wait is raced
//! against the session's cancellation token.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use spectate_client::SpectatorError;
use tokio_util::sync::CancellationToken;

/// Exponential backoff with jitter, capped and bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Retries after the first attempt
    pub max_times: usize,
}

impl RetryPolicy {
    /// Fresh delay schedule; yields `max_times` delays then `None`
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_times)
            .with_jitter()
            .build()
    }
}

/// Sleep unless cancelled first. Returns `false` on cancellation.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = cancel.cancelled() => false,
    }
}

/// Run `op` until it succeeds, fails permanently, or the policy runs out
///
/// Only transient errors are retried. `Ok(None)` means the token was
/// cancelled; the in-flight attempt is dropped rather than awaited. On
/// exhaustion the last transient error is returned.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut op: F,
) -> Result<Option<T>, SpectatorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SpectatorError>>,
{
    let mut last_err = None;
    for delay in std::iter::once(Duration::ZERO).chain(policy.backoff()) {
        if delay > Duration::ZERO && !sleep_or_cancel(delay, cancel).await {
            return Ok(None);
        }
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let result = tokio::select! {
            r = op() => r,
            () = cancel.cancelled() => return Ok(None),
        };

        match result {
            Ok(value) => return Ok(Some(value)),
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "{what} failed, will retry");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| SpectatorError::Network(format!("{what}: retries exhausted"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(max_times: usize) -> RetryPolicy {
        RetryPolicy {
            min_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            max_times,
        }
    }

    #[test]
    fn test_backoff_is_bounded() {
        let delays: Vec<_> = policy(3).backoff().collect();
        assert_eq!(delays.len(), 3);
        // jitter adds at most one extra delay on top of the cap
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();

        let result = retry_transient(&policy(3), &cancel, "op", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(SpectatorError::Network("reset".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();

        let result: Result<Option<()>, _> = retry_transient(&policy(2), &cancel, "op", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SpectatorError::Status {
                status: 502,
                url: "u".into(),
            })
        })
        .await;

        assert!(matches!(result, Err(SpectatorError::Status { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_does_not_retry_decode() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let cancel = CancellationToken::new();

        let result: Result<Option<()>, _> = retry_transient(&policy(5), &cancel, "op", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SpectatorError::Decode("bad".into()))
        })
        .await;

        assert!(matches!(result, Err(SpectatorError::Decode(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<Option<()>, _> =
            retry_transient(&policy(5), &cancel, "op", || async { Ok(()) }).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(Duration::from_secs(1), &cancel).await);
        cancel.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(1), &cancel).await);
    }
}
