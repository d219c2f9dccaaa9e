//! Retry and rate-limit policies
//!
//! Retry behavior is carried by explicit policy values instead of ad-hoc
//! sleeps in the fetch loop, so it is unit-testable without triggering real
//! failures.

use governor::{Quota, RateLimiter};
use rand::Rng;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Shared token-bucket limiter gating all outbound RPC calls.
///
/// A single bucket is shared by every worker, so the aggregate request rate
/// never exceeds the ceiling regardless of concurrency.
pub type SharedRateLimiter = Arc<governor::DefaultDirectRateLimiter>;

/// Build the process-wide limiter for a requests-per-second ceiling.
pub fn rate_limiter(requests_per_second: u32) -> SharedRateLimiter {
    let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// First retry delay
    pub base: Duration,
    /// Upper bound on any single delay
    pub cap: Duration,
    /// Attempts per window span before the caller shrinks the window
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration, max_retries: u32) -> Self {
        Self {
            base,
            cap,
            max_retries,
        }
    }

    /// Deterministic delay for the nth retry (0-based), before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = self.base.saturating_mul(1u32 << attempt.min(16));
        exp.min(self.cap)
    }

    /// Jittered delay for the nth retry. Jitter spreads synchronized workers
    /// that were rate-limited at the same instant.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter_ms = base.as_millis() as u64 / 2;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}
