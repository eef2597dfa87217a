//! Per-origin rate limiting.
//!
//! The dispatcher only sees the [`RateLimitCheck`] trait: given an origin it
//! returns `None` to admit the request, or the message to send back with a
//! 429. [`OriginRateLimiter`] is the built-in token bucket implementation.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Rate-limit predicate consulted once per admitted request.
pub trait RateLimitCheck: Send + Sync {
    /// Returns the rejection message if `origin` is over its limit.
    fn check(&self, origin: &str) -> Option<String>;
}

/// Never limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRateLimit;

impl RateLimitCheck for NoRateLimit {
    fn check(&self, _origin: &str) -> Option<String> {
        None
    }
}

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token bucket per origin.
///
/// A bucket left idle for `refill_window` is full again, the same as a
/// fresh one, so such buckets are dropped.
pub struct OriginRateLimiter {
    buckets: DashMap<String, TokenBucket>,
    exempt: HashSet<String>,
    rps: f64,
    burst: f64,
    refill_window: Duration,
    last_sweep: Mutex<Instant>,
}

impl OriginRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let rps = f64::from(config.requests_per_second);
        let burst = f64::from(config.burst_size);
        Self {
            buckets: DashMap::new(),
            exempt: config.exempt_origins.iter().cloned().collect(),
            rps,
            burst,
            refill_window: Duration::try_from_secs_f64(burst / rps).unwrap_or(Duration::MAX),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Number of origins currently tracked.
    pub fn tracked_origins(&self) -> usize {
        self.buckets.len()
    }

    /// Drop buckets idle for a whole refill window, at most once per window.
    fn evict_idle(&self) {
        let now = Instant::now();
        {
            let mut last_sweep = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
            if now.duration_since(*last_sweep) < self.refill_window {
                return;
            }
            *last_sweep = now;
        }

        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_update) < self.refill_window);
        tracing::debug!(evicted = before.saturating_sub(self.buckets.len()), "Evicted idle rate-limit buckets");
    }
}

impl RateLimitCheck for OriginRateLimiter {
    fn check(&self, origin: &str) -> Option<String> {
        if self.exempt.contains(origin) {
            return None;
        }

        self.evict_idle();

        // The entry guard holds its shard lock; it must be released before
        // the next sweep takes every shard.
        let admitted = self
            .buckets
            .entry(origin.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst))
            .try_acquire(self.burst, self.rps);

        if admitted {
            None
        } else {
            tracing::warn!(origin = %origin, "Rate limit exceeded");
            Some(format!(
                "The origin \"{}\" has sent too many requests. At most {} requests per second are allowed.",
                origin, self.rps
            ))
        }
    }
}
