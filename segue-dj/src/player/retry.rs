//! Bounded retry with backoff
//!
//! Generic combinator replacing ad hoc retry loops around remote player
//! calls. Parameterized by a predicate on the error type so callers decide
//! which failures are worth retrying (e.g. device-not-ready yes,
//! forbidden no).

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry policy: attempt count and backoff shape
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Backoff multiplier between attempts
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            multiplier: 2,
        }
    }
}

/// Run `op` until it succeeds, the error is not retryable, or attempts
/// run out. Returns the last error on exhaustion.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut op: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut backoff = policy.initial_backoff;
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                debug!(
                    "attempt {}/{} failed ({}), retrying in {:?}",
                    attempt, attempts, e, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= policy.multiplier;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("loop always returns")
}
