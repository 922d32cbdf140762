//! Bounded retry for conflicting ledger commits.

use std::future::Future;

use super::config::RetryPolicy;
use super::errors::{LedgerError, LedgerResult};

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of attempts.
///
/// # Errors
///
/// * `LedgerError::Aborted` - Every attempt hit a `Conflict`
/// * Any non-retryable error returned by `attempt`
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    operation: &str,
    mut attempt: F,
) -> LedgerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LedgerResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for n in 1..=max_attempts {
        match attempt().await {
            Err(err) if err.is_retryable() => {
                log::debug!("{operation}: attempt {n}/{max_attempts} conflicted: {err}");
                if n < max_attempts && !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            other => return other,
        }
    }

    log::warn!("{operation}: aborted after {max_attempts} conflicting attempts");
    Err(LedgerError::Aborted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_conflicts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(policy(3), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LedgerError::Conflict("busy".to_string()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_aborts_when_exhausted() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: LedgerResult<()> = with_retry(policy(4), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Conflict("busy".to_string()))
        })
        .await;

        assert!(matches!(result, Err(LedgerError::Aborted { attempts: 4 })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: LedgerResult<()> = with_retry(policy(5), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::SelfTransfer)
        })
        .await;

        assert!(matches!(result, Err(LedgerError::SelfTransfer)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
