//! Fixed-delay retry for batch submission.
//!
//! A batch that fails to post is retried as a whole, after a constant delay,
//! until it succeeds. There is no attempt limit and no backoff growth.

use search_client::{Batch, IndexService, ServiceError};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Delay applied between attempts when none is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Constant-delay, unbounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::constant(DEFAULT_RETRY_DELAY)
    }
}

/// Value produced by a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    /// Attempts that failed before the successful one
    pub failed_attempts: u32,
}

impl RetryPolicy {
    pub const fn constant(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it returns `Ok`.
    ///
    /// `on_failure` sees the 1-based number of the failed attempt and its
    /// error before the policy sleeps.
    pub async fn run_until_success<T, E, F, Fut>(
        &self,
        mut operation: F,
        mut on_failure: impl FnMut(u32, &E),
    ) -> Retried<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut failed_attempts = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    return Retried {
                        value,
                        failed_attempts,
                    }
                }
                Err(e) => {
                    failed_attempts += 1;
                    on_failure(failed_attempts, &e);
                }
            }
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Post `batch`, retrying every [`ServiceError`] until the service accepts it.
///
/// Returns the number of failed attempts.
pub async fn post_with_retry(
    service: &dyn IndexService,
    batch: &Batch,
    policy: &RetryPolicy,
    worker: usize,
) -> u32 {
    let retried = policy
        .run_until_success(
            || service.post_batch(batch),
            |attempt, e: &ServiceError| {
                warn!(
                    "Worker {worker}: failed to post batch of {} documents (attempt {attempt}): {e}. Retrying in {:?}...",
                    batch.len(),
                    policy.delay()
                );
            },
        )
        .await;

    if retried.failed_attempts > 0 {
        info!(
            "Worker {worker}: posted batch after {} attempts",
            retried.failed_attempts + 1
        );
    }

    retried.failed_attempts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedIndex;
    use search_client::Document;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn test_run_until_success_counts_failures() {
        let calls = Cell::new(0u32);
        let mut seen = Vec::new();

        let retried = RetryPolicy::constant(Duration::from_millis(500))
            .run_until_success(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n <= 3 {
                            Err(format!("failure {n}"))
                        } else {
                            Ok(n * 10)
                        }
                    }
                },
                |attempt, e: &String| seen.push((attempt, e.clone())),
            )
            .await;

        assert_eq!(retried.value, 40);
        assert_eq!(retried.failed_attempts, 3);
        assert_eq!(calls.get(), 4);
        assert_eq!(seen[0], (1, "failure 1".to_string()));
        assert_eq!(seen[2], (3, "failure 3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_success_waits_fixed_delay() {
        let start = tokio::time::Instant::now();
        let calls = Cell::new(0u32);

        RetryPolicy::constant(Duration::from_millis(500))
            .run_until_success(
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 {
                            Err(())
                        } else {
                            Ok(())
                        }
                    }
                },
                |_, _| {},
            )
            .await;

        // Two failures, two constant delays, no growth
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_does_not_sleep() {
        let start = tokio::time::Instant::now();
        let retried = RetryPolicy::default()
            .run_until_success(|| async { Ok::<_, ()>(7) }, |_, _| {})
            .await;

        assert_eq!(retried.failed_attempts, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_with_retry_until_accepted() {
        let service = SimulatedIndex::new();
        service.fail_next_posts(2);
        let batch: Batch = vec![Document::new("id", "text", "tag")].into();

        let failed = post_with_retry(&service, &batch, &RetryPolicy::default(), 0).await;

        assert_eq!(failed, 2);
        assert_eq!(service.post_attempts(), 3);
        assert_eq!(service.accepted_documents(), 1);
    }
}
