//! Per-API-key admission control using the token bucket algorithm.
//!
//! Each key gets a bucket with `capacity = rate_limit_per_minute` refilled
//! at `capacity / 60` tokens per second. Buckets are created lazily on a
//! key's first request and live for the life of the process. Rate limiting
//! is process-local by design.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

use crate::core::error::GatewayError;

/// A single token bucket.
///
/// Mutated only under its owning mutex; all clock reads are passed in so the
/// refill arithmetic is testable.
#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    refill_rate_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_rate_per_sec: capacity / 60.0,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Refill from elapsed time, then try to take one token.
    fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until one token becomes available.
    fn retry_after_secs(&self) -> u64 {
        if self.tokens >= 1.0 || self.refill_rate_per_sec <= 0.0 {
            return 0;
        }
        ((1.0 - self.tokens) / self.refill_rate_per_sec).ceil() as u64
    }
}

/// Rate limiter managing one token bucket per API key id.
pub struct RateLimiter {
    buckets: DashMap<Uuid, Arc<Mutex<TokenBucket>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Admit or reject one request for the given key.
    ///
    /// The bucket is created on first sight of the key; the `entry` API
    /// serializes racing creators so exactly one bucket wins.
    pub fn check(&self, key_id: Uuid, rate_limit_per_minute: u32) -> Result<(), GatewayError> {
        self.check_at(key_id, rate_limit_per_minute, Instant::now())
    }

    fn check_at(
        &self,
        key_id: Uuid,
        rate_limit_per_minute: u32,
        now: Instant,
    ) -> Result<(), GatewayError> {
        let bucket = self
            .buckets
            .entry(key_id)
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(rate_limit_per_minute, now))))
            .clone();

        let mut bucket = bucket.lock().expect("token bucket mutex poisoned");
        if bucket.try_consume(now) {
            Ok(())
        } else {
            Err(GatewayError::RateLimited {
                retry_after_secs: bucket.retry_after_secs().max(1),
            })
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_allows_up_to_capacity() {
        let limiter = RateLimiter::new();
        let key = Uuid::new_v4();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at(key, 5, now).is_ok());
        }
        assert!(limiter.check_at(key, 5, now).is_err());
    }

    #[test]
    fn test_sixty_first_request_rejected() {
        let limiter = RateLimiter::new();
        let key = Uuid::new_v4();
        let now = Instant::now();

        // 61 requests within 500ms of a fresh bucket: the refill adds less
        // than one token, so exactly 60 are admitted.
        let mut admitted = 0;
        for i in 0..61u32 {
            let t = now + Duration::from_millis(u64::from(i) * 8);
            if limiter.check_at(key, 60, t).is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 60);
    }

    #[test]
    fn test_refill_restores_tokens() {
        let limiter = RateLimiter::new();
        let key = Uuid::new_v4();
        let now = Instant::now();

        for _ in 0..60 {
            assert!(limiter.check_at(key, 60, now).is_ok());
        }
        assert!(limiter.check_at(key, 60, now).is_err());

        // 60 req/min refills one token per second.
        assert!(limiter.check_at(key, 60, now + Duration::from_secs(1)).is_ok());
        assert!(limiter.check_at(key, 60, now + Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_refill_clamped_to_capacity() {
        let limiter = RateLimiter::new();
        let key = Uuid::new_v4();
        let now = Instant::now();

        assert!(limiter.check_at(key, 2, now).is_ok());

        // A long idle period refills to capacity, never beyond it.
        let later = now + Duration::from_secs(3600);
        assert!(limiter.check_at(key, 2, later).is_ok());
        assert!(limiter.check_at(key, 2, later).is_ok());
        assert!(limiter.check_at(key, 2, later).is_err());
    }

    #[test]
    fn test_retry_after_reported() {
        let limiter = RateLimiter::new();
        let key = Uuid::new_v4();
        let now = Instant::now();

        assert!(limiter.check_at(key, 60, now).is_ok());
        for _ in 0..59 {
            let _ = limiter.check_at(key, 60, now);
        }
        match limiter.check_at(key, 60, now) {
            Err(GatewayError::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs >= 1);
            }
            other => panic!("expected rate limit rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_buckets_are_independent_per_key() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let key_a = Uuid::new_v4();
        let key_b = Uuid::new_v4();

        assert!(limiter.check_at(key_a, 1, now).is_ok());
        assert!(limiter.check_at(key_a, 1, now).is_err());

        // key_b has its own bucket.
        assert!(limiter.check_at(key_b, 1, now).is_ok());
    }

    #[test]
    fn test_steady_state_admission_bound() {
        let limiter = RateLimiter::new();
        let key = Uuid::new_v4();
        let now = Instant::now();
        let rate = 120u32; // 2 tokens/sec

        // Drain the initial burst.
        for _ in 0..rate {
            assert!(limiter.check_at(key, rate, now).is_ok());
        }

        // Over the next 10 seconds, admissions cannot exceed refill.
        let mut admitted = 0;
        for ms in (0..10_000).step_by(50) {
            let t = now + Duration::from_millis(ms as u64);
            if limiter.check_at(key, rate, t).is_ok() {
                admitted += 1;
            }
        }
        assert!(admitted <= 20, "admitted {admitted} > refill bound");
    }
}
