//! Bounded retry with exponential backoff and jitter.
//!
//! The policy wraps a single retryable operation. Whether a failure is worth
//! another attempt is decided by the error itself through [`Retryable`];
//! non-retryable failures are returned immediately.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::errors::Retryable;

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default lower bound for a single wait.
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_secs(4);

/// Default upper bound for a single wait.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Hard ceiling for any single wait, whatever the configuration says.
pub const MAX_RETRY_WAIT: Duration = Duration::from_secs(3600);

/// Retry policy configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Lower bound of each wait.
    pub min_wait: Duration,
    /// Upper bound of each wait.
    pub max_wait: Duration,
    /// Growth factor between consecutive waits.
    pub multiplier: f64,
    /// Add up to 25% random jitter to each wait.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_wait: DEFAULT_MIN_WAIT,
            max_wait: DEFAULT_MAX_WAIT,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Final result of a retried operation plus the number of attempts made.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl RetryPolicy {
    /// Policy that never waits. Intended for tests and replays.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// `(min, max)` wait, capped at [`MAX_RETRY_WAIT`] with `max >= min`.
    fn wait_bounds(&self) -> (Duration, Duration) {
        let min = self.min_wait.min(MAX_RETRY_WAIT);
        let max = self.max_wait.min(MAX_RETRY_WAIT).max(min);
        (min, max)
    }

    /// Wait before retry number `retry` (1-based), without jitter.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(30) as i32;
        let (min, max) = self.wait_bounds();
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            1.0
        };
        let scaled = min.as_secs_f64() * multiplier.powi(exponent);
        Duration::try_from_secs_f64(scaled).map_or(max, |wait| wait.clamp(min, max))
    }

    /// Wait before retry number `retry`, jitter applied and bounds enforced.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let span = base.as_secs_f64() * 0.25;
        let extra = rand::thread_rng().gen_range(0.0..=span);
        let (_, upper) = self.wait_bounds();
        (base + Duration::from_secs_f64(extra)).min(upper)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The closure receives the 1-based
    /// attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.attempts();
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded on attempt {}/{}", attempt, max_attempts);
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let wait = self.delay_for(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:.1}s",
                        attempt,
                        max_attempts,
                        err,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        warn!("Giving up after {} attempts: {}", attempt, err);
                    } else {
                        debug!("Non-retryable failure on attempt {}: {}", attempt, err);
                    }
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}
