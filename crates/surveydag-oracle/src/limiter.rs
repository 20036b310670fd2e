//! Shared token-bucket rate limiter
//!
//! One limiter instance is shared across all concurrent oracle workers; it
//! is the only mutable state the workers share. The token count is guarded
//! by a mutex, and the sleep-to-refill step happens outside the lock so a
//! starved worker never blocks the others.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Thread-safe token bucket limiting oracle calls per minute.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    fill_rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// Create a limiter with a calls-per-minute budget.
    ///
    /// # Panics
    ///
    /// Panics if `calls_per_minute` is zero; a zero budget would deadlock
    /// every worker, which is a configuration bug, not a runtime condition.
    pub fn per_minute(calls_per_minute: u32) -> Self {
        assert!(calls_per_minute > 0, "calls_per_minute must be > 0");
        let capacity = f64::from(calls_per_minute);
        Self {
            capacity,
            fill_rate: capacity / 60.0,
            state: Mutex::new(BucketState { tokens: capacity, last: Instant::now() }),
        }
    }

    /// Block until a token is available, then consume it.
    pub fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("rate limiter poisoned");
                let now = Instant::now();
                let elapsed = now.duration_since(state.last).as_secs_f64();
                if elapsed > 0.0 {
                    state.tokens = (state.tokens + elapsed * self.fill_rate).min(self.capacity);
                    state.last = now;
                }
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                let deficit = 1.0 - state.tokens;
                Duration::from_secs_f64(deficit / self.fill_rate)
            };
            // Sleep outside the lock; wake at most every 500ms to keep
            // latency low when tokens refill early.
            std::thread::sleep(wait.min(Duration::from_millis(500)));
        }
    }

    /// Tokens currently available (for tests and diagnostics).
    pub fn available(&self) -> f64 {
        let state = self.state.lock().expect("rate limiter poisoned");
        state.tokens
    }
}
