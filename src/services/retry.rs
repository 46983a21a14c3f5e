//! Bounded retry for idempotent reads

use std::future::Future;
use std::time::Duration;

use crate::config::RetrySettings;
use crate::services::github::ApiResult;

/// Fixed-delay retry of transient failures.
///
/// Only [`ApiError::is_transient`](crate::error::ApiError::is_transient)
/// failures are repeated; anything else is returned after the first
/// attempt. Never wrap a create call in this: a repeated commit creation
/// would leave a second, divergent commit object behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.attempts,
                        "{} failed, retrying in {:?}: {}",
                        operation,
                        self.delay,
                        e
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        (&RetrySettings::default()).into()
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(settings.attempts, settings.delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ApiErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        let result = policy
            .run("list", || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ApiError::network("connection reset"))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        let result: ApiResult<()> = policy
            .run("list", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::new(ApiErrorKind::Server, "bad gateway", Some(502)))
            })
            .await;

        assert_eq!(result.unwrap_err().status, Some(502));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_authentication_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::default();

        let result: ApiResult<()> = policy
            .run("list", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::new(ApiErrorKind::Authentication, "Bad credentials", Some(401)))
            })
            .await;

        assert_eq!(result.unwrap_err().kind, ApiErrorKind::Authentication);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
        assert_eq!(RetryPolicy::default().attempts(), 3);
    }
}
