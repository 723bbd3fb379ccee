//! crates/courseware_core/src/retry.rs
//!
//! Exponential backoff for transient generation failures. Only errors the
//! adapters classify as `PortError::Transient` are retried.

use crate::ports::{PortError, PortResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> PortResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PortResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(PortError::Transient(msg)) if attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(attempt = attempt + 1, ?delay, "Transient generation failure, retrying: {}", msg);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_with_backoff() {
        let policy = RetryPolicy::default();
        let calls = &AtomicU32::new(0);
        let started = Instant::now();

        let result = policy
            .run(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PortError::Transient("429".to_string()))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1500ms + 3000ms of backoff before the third attempt.
        assert!(started.elapsed() >= Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let policy = RetryPolicy::default();
        let calls = &AtomicU32::new(0);

        let result: PortResult<()> = policy
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PortError::Transient("503".to_string()))
            })
            .await;

        assert!(matches!(result, Err(PortError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_retry_permanent_failures() {
        let policy = RetryPolicy::default();
        let calls = &AtomicU32::new(0);

        let result: PortResult<()> = policy
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PortError::Unexpected("invalid api key".to_string()))
            })
            .await;

        assert!(matches!(result, Err(PortError::Unexpected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(6000));
    }
}
