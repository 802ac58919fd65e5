use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::error::{classify, ClassifiedError, ErrorKind, TierFailure};

/// Upper bound of the random jitter added to each backoff, in seconds
const MAX_JITTER_SECS: f64 = 0.5;

/// Bounded exponential backoff for rate-limited failures.
///
/// Only failures classified as rate-limited are retried; anything else is
/// returned after the first attempt. There is no ceiling on the delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// `base_delay * 2^(attempt-1) + jitter` for the given 1-based attempt
    pub fn backoff_delay(&self, attempt: u32, jitter_secs: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * 2f64.powi(exponent) + jitter_secs;
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Run `operation` until it succeeds, fails for a reason other than rate
    /// limiting, or runs out of attempts. Every failure is classified once.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TierFailure>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let failure = match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            let classified = classify(&failure);
            if classified.kind != ErrorKind::RateLimited || attempt >= max_attempts {
                return Err(classified);
            }

            let jitter = rand::rng().random_range(0.0..MAX_JITTER_SECS);
            let delay = self.backoff_delay(attempt, jitter);
            tracing::warn!(
                "Rate limited (attempt {}/{}), retrying in {:.2}s",
                attempt,
                max_attempts,
                delay.as_secs_f64()
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
