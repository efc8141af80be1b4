//! Bounded retry with exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use tastemap_common::EngineError;

/// Run `op` up to `max_attempts` times, backing off `base * 3^attempt` plus
/// random jitter between attempts. Only transient errors are retried;
/// permanent errors and dimension mismatches surface immediately.
pub async fn with_backoff<T, F, Fut>(
    op: F,
    max_attempts: u32,
    base: Duration,
    label: &str,
) -> Result<T, EngineError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if attempt + 1 < max_attempts {
                    let backoff = base * 3u32.pow(attempt);
                    let jitter = Duration::from_millis(rand::rng().random_range(0..500));
                    warn!(
                        label,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying after backoff"
                    );
                    tokio::time::sleep(backoff + jitter).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        EngineError::ProviderTransient(format!("{label}: no attempts were made"))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(EngineError::ProviderTransient("flaky".into()))
                    } else {
                        Ok(42)
                    }
                }
            },
            3,
            Duration::from_millis(1),
            "test",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(EngineError::ProviderTransient("still down".into())) }
            },
            3,
            Duration::from_millis(1),
            "test",
        )
        .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(EngineError::ProviderPermanent("bad key".into())) }
            },
            5,
            Duration::from_millis(1),
            "test",
        )
        .await;
        assert!(!result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
