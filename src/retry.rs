//! Bounded exponential-backoff retry for transient transport failures.
//!
//! Only errors classified `TransientTransport` (connection reset, timeout,
//! HTTP 503/429) are retried; everything else is returned on first
//! occurrence. Backoff for attempt n is `min(base * 2^n, max)` with a
//! multiplicative jitter in [0.5, 1.5] so concurrent callers do not retry
//! in lockstep. Dropping the returned future (request cancellation) stops
//! further attempts; the backoff sleep is cancel-safe.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{BrokerError, BrokerResult};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay, ..Self::default() }
    }

    /// Jittered backoff for a zero-based attempt index.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter: f64 = rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_secs_f64(exp.as_secs_f64() * jitter)
    }
}

/// Run `op` under the policy. The last observed error is returned verbatim,
/// except that an exhausted transient failure escalates to `Database` so
/// callers upstream never see the retryable classification.
pub async fn run<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> BrokerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BrokerResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "transient failure (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(BrokerError::TransientTransport(detail)) => {
                // Retries exhausted.
                return Err(BrokerError::Database(format!(
                    "transient failure persisted after {} attempts: {}",
                    attempts, detail
                )));
            }
            Err(e) => return Err(e),
        }
    }
}
