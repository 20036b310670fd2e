//! Retry-with-backoff policy around oracle calls
//!
//! An explicit policy object (max attempts, base delay, max delay, jitter,
//! retry predicate) wrapping a single call site, independent of the
//! concurrency model the caller uses.

use crate::limiter::RateLimiter;
use crate::OracleError;
use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Jitter fraction applied as `delay * (1 ± jitter)`
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries (tests, dry runs).
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Backoff delay for a retry attempt (1-based), before jitter.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1u32 << exponent.min(31));
        delay.min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let mut rng = rand::thread_rng();
        let factor = 1.0 + rng.gen_range(-self.jitter..=self.jitter);
        delay.mul_f64(factor.max(0.0))
    }
}

/// Run `call` under the shared rate limiter, retrying transient failures
/// per the policy. Non-transient errors propagate immediately; an
/// exhausted budget surfaces as [`OracleError::RetriesExhausted`].
pub fn with_retries<T, F>(
    limiter: &RateLimiter,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, OracleError>
where
    F: FnMut() -> Result<T, OracleError>,
{
    let mut attempt = 0usize;
    loop {
        limiter.acquire();
        match call() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                std::thread::sleep(policy.jittered(policy.delay_for_attempt(attempt)));
            }
            Err(err) if err.is_transient() => {
                return Err(OracleError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
}
