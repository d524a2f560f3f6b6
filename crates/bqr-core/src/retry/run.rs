//! Hand an operation to the retry engine under a policy.

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::{Duration, Instant};

use super::error::{CallError, RemoteError};
use super::policy::RetryPolicy;

/// Delay before the next attempt: the engine's jittered delay, capped at the
/// policy's `max_delay` and at the time left before the deadline.
fn capped_delay(policy: &RetryPolicy, elapsed: Duration, delay: Option<Duration>) -> Option<Duration> {
    let remaining = policy.deadline().saturating_sub(elapsed);
    delay.map(|d| d.min(policy.max_delay()).min(remaining))
}

/// Runs `op` until it succeeds, the policy's predicate rejects the error, or
/// the policy's deadline has passed. Backoff, jitter and sleeping are done by
/// `backon`; no sleep runs past the deadline.
///
/// The last error is returned unchanged as [`CallError::Remote`]. If the
/// predicate cannot classify it, [`CallError::Contract`] is returned instead.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let start = Instant::now();
    let deadline = policy.deadline();
    let backoff = ExponentialBuilder::default()
        .with_min_delay(policy.initial_delay())
        .with_max_delay(policy.max_delay())
        .with_factor(policy.multiplier())
        .with_max_times(usize::MAX)
        .with_jitter();

    let result = op
        .retry(backoff)
        .when(|e: &RemoteError| {
            matches!(policy.should_retry(e), Ok(true)) && start.elapsed() < deadline
        })
        .adjust(|_: &RemoteError, delay| capped_delay(policy, start.elapsed(), delay))
        .notify(|e: &RemoteError, delay| {
            tracing::warn!(error = %e, ?delay, elapsed = ?start.elapsed(), "retrying remote call");
        })
        .await;

    result.map_err(|e| match policy.should_retry(&e) {
        Err(violation) => {
            tracing::error!("cannot classify remote error: {}", violation);
            CallError::Contract { violation, source: e }
        }
        Ok(retryable) => {
            if retryable {
                tracing::debug!(elapsed = ?start.elapsed(), "retry deadline reached: {}", e);
            }
            CallError::Remote(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::error::{ErrorKind, SubError};
    use crate::retry::policy::DEFAULT_RETRY;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy() -> RetryPolicy {
        DEFAULT_RETRY
            .with_delay(Duration::from_millis(1), Duration::from_millis(4), 2.0)
            .with_deadline(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicUsize::new(0);
        let out = call_with_retry(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RemoteError::unstructured(ErrorKind::ConnectionFailure, "reset"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_returned_after_one_call() {
        let calls = AtomicUsize::new(0);
        let err = call_with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(RemoteError::structured(
                    ErrorKind::NotFound,
                    "Not found: Dataset p:d",
                    vec![SubError::with_reason("notFound")],
                ))
            }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match err {
            CallError::Remote(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn gives_up_at_deadline_with_last_error() {
        let policy = fast_policy().with_deadline(Duration::from_millis(30));
        let calls = AtomicUsize::new(0);
        let start = Instant::now();
        let err = call_with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<(), _>(RemoteError::unstructured(
                    ErrorKind::BadGateway,
                    format!("attempt {n}"),
                ))
            }
        })
        .await
        .unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(start.elapsed() < Duration::from_secs(1));
        let total = calls.load(Ordering::SeqCst);
        assert!(total > 1);
        assert_eq!(err.remote().message(), format!("attempt {}", total - 1));
    }

    #[tokio::test]
    async fn long_backoff_is_cut_to_deadline() {
        let policy = DEFAULT_RETRY
            .with_delay(Duration::from_millis(800), Duration::from_millis(800), 1.0)
            .with_deadline(Duration::from_millis(50));
        let calls = AtomicUsize::new(0);
        let start = Instant::now();
        let err = call_with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(RemoteError::unstructured(ErrorKind::BadGateway, "")) }
        })
        .await
        .unwrap_err();
        assert_eq!(err.remote().kind(), ErrorKind::BadGateway);
        assert!(start.elapsed() < Duration::from_millis(500));
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn delay_capped_by_max_delay_and_deadline() {
        let policy = DEFAULT_RETRY
            .with_delay(Duration::from_secs(1), Duration::from_secs(60), 2.0)
            .with_deadline(Duration::from_secs(600));
        // Jitter can push the engine's delay past the cap.
        assert_eq!(
            capped_delay(&policy, Duration::from_secs(10), Some(Duration::from_secs(110))),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            capped_delay(&policy, Duration::from_secs(599), Some(Duration::from_secs(30))),
            Some(Duration::from_secs(1))
        );
        assert_eq!(
            capped_delay(&policy, Duration::from_secs(700), Some(Duration::from_secs(5))),
            Some(Duration::ZERO)
        );
        assert_eq!(
            capped_delay(&policy, Duration::from_secs(1), Some(Duration::from_millis(1500))),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(capped_delay(&policy, Duration::ZERO, None), None);
    }

    #[tokio::test]
    async fn missing_reason_surfaces_contract_error() {
        let calls = AtomicUsize::new(0);
        let err = call_with_retry(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(RemoteError::structured(
                    ErrorKind::InternalServerError,
                    "boom",
                    vec![SubError::default()],
                ))
            }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, CallError::Contract { .. }));
        assert_eq!(err.remote().kind(), ErrorKind::InternalServerError);
    }
}
