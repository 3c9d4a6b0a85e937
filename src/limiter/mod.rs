//! Concurrency limiter (C2): bound the number of concurrent expensive
//! operations, admitting the rest in FIFO order.
//!
//! Built on a `tokio::sync::Semaphore`, which already queues acquirers in
//! FIFO order and releases permits deterministically on drop — exactly the
//! ordering and release-on-completion guarantees spec §4.2 and §5 require.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Gate that admits at most `max` concurrent tasks.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    /// `max` is clamped to at least 1.
    #[must_use]
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max.max(1))),
        }
    }

    /// Run `task` once a slot is available. The slot is held for the
    /// duration of `task` and released when it completes, whether it
    /// succeeds or fails; queued callers are admitted strictly in the order
    /// they called `run`.
    pub async fn run<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore is never closed");
        let result = task().await;
        drop(permit);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_max_concurrency() {
        let limiter = ConcurrencyLimiter::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            let active = active.clone();
            let max_observed = max_observed.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .run(|| async {
                        let cur = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_observed.fetch_max(cur, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }

        for h in handles {
            h.await.unwrap();
        }

        assert!(max_observed.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn slot_released_on_failure_too() {
        let limiter = ConcurrencyLimiter::new(1);

        let first: Result<(), &str> = limiter.run(|| async { Err("boom") }).await;
        assert!(first.is_err());

        // If the failing task had not released its slot, this would hang.
        let second: Result<(), &str> = tokio::time::timeout(
            Duration::from_millis(200),
            limiter.run(|| async { Ok(()) }),
        )
        .await
        .expect("limiter deadlocked after a failing task");
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn clamps_max_to_at_least_one() {
        let limiter = ConcurrencyLimiter::new(0);
        let result = tokio::time::timeout(Duration::from_millis(200), limiter.run(|| async { 1 }))
            .await;
        assert_eq!(result.unwrap(), 1);
    }
}
