//! Bounded remote-call execution
//!
//! Every remote call made during a synchronization goes through one
//! [`RemoteCallLimiter`]: a semaphore caps the calls in flight, an optional
//! minimum interval spaces call starts, and retryable failures are retried
//! with exponential backoff.

use crate::error::ApiError;
use crate::sync::SyncConfig;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::{sleep_until, Instant};
use tracing::warn;

pub struct RemoteCallLimiter {
    semaphore: Semaphore,
    next_slot: Mutex<Option<Instant>>,
    min_interval: Option<Duration>,
    max_retry_attempts: usize,
    retry_delay: Duration,
}

impl RemoteCallLimiter {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            semaphore: Semaphore::new(config.max_concurrent_calls.max(1)),
            next_slot: Mutex::new(None),
            min_interval: config
                .min_call_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            max_retry_attempts: config.max_retry_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, ApiError> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ApiError::RemoteRateLimit("call limiter closed".to_string()))?;

        if let Some(interval) = self.min_interval {
            // Reserve the next start slot before sleeping so concurrent
            // callers queue up behind each other.
            let start_at = {
                let mut next = self.next_slot.lock();
                let now = Instant::now();
                let start_at = match *next {
                    Some(slot) if slot > now => slot,
                    _ => now,
                };
                *next = Some(start_at + interval);
                start_at
            };
            sleep_until(start_at).await;
        }

        Ok(permit)
    }

    /// Backoff before retry number `attempt` (0-based)
    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.retry_delay.saturating_mul(factor)
    }

    /// Run `call` under the concurrency cap, retrying retryable failures.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            let result = {
                let _permit = self.acquire().await?;
                call().await
            };
            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retry_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Remote call failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
