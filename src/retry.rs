//! Bounded exponential-backoff retry.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::warn;

use crate::duration::deserialize_duration;

fn default_max_total_wait() -> Duration {
    Duration::from_secs(60)
}

fn default_base_delay() -> Duration {
    Duration::from_millis(250)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

/// How long and how often to retry a failing operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total wall-clock budget across all attempts and delays.
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_total_wait: Duration,

    /// Delay after the first failed attempt; doubled after each further one.
    #[serde(deserialize_with = "deserialize_duration")]
    pub base_delay: Duration,

    #[serde(deserialize_with = "deserialize_duration")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_total_wait: default_max_total_wait(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay after the 0-based `attempt` failed: `min(base_delay * 2^attempt, max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// The error that ended a [`retry`] loop, with how long it took to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure<E> {
    pub error: E,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// the next delay would take the total past `policy.max_total_wait`.
pub async fn retry<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    mut op: Op,
) -> Result<T, RetryFailure<E>>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let failure = |error| RetryFailure {
            error,
            attempts: attempt + 1,
            elapsed: started.elapsed(),
        };

        if !is_retryable(&err) {
            return Err(failure(err));
        }

        let delay = policy.delay_for(attempt);
        if started.elapsed() + delay > policy.max_total_wait {
            warn!(
                attempts = attempt + 1,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "Giving up after retry budget was exhausted"
            );
            return Err(failure(err));
        }

        warn!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Attempt failed; retrying"
        );
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
