//! Per-connection token bucket.
//!
//! Each connection owns its own bucket; there is no shared state and no
//! background refill task. Tokens accrue lazily from elapsed time on each
//! acquisition attempt.

use std::time::Instant;

/// Token bucket rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a full bucket with the given burst capacity and refill rate.
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            tokens: f64::from(capacity),
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    /// Take one token if available.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_up_to_capacity_then_denied() {
        let mut limiter = RateLimiter::new(3, 0.0);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn refill_restores_tokens() {
        let mut limiter = RateLimiter::new(1, 1000.0);
        assert!(limiter.try_acquire());
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(limiter.try_acquire());
    }

    #[test]
    fn tokens_never_exceed_capacity() {
        let mut limiter = RateLimiter::new(2, 1_000_000.0);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
