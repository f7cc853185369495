//! Bounded reconnect backoff.
//!
//! Exponential delay growth with a cap, and a hard retry limit: after the
//! cap the policy reports exhaustion and the client surfaces a terminal
//! failed-connection state. No retry logic lives anywhere else in the core.

use std::time::Duration;

/// Reconnect backoff policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    /// Create a policy with the given base delay, delay cap, and attempt cap.
    pub fn new(base: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self { base, max_delay, max_attempts, attempt: 0 }
    }

    /// Delay before the next reconnect attempt, or `None` when the attempt
    /// cap is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let exponent = self.attempt.min(16);
        self.attempt += 1;
        let delay = self.base.saturating_mul(1u32 << exponent);
        Some(delay.min(self.max_delay))
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Attempts consumed since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30), 8)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_until_cap() {
        let mut backoff =
            Backoff::new(Duration::from_millis(100), Duration::from_millis(450), 10);

        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(400)));
        // Clamped to the cap from here on.
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(450)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(450)));
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), 3);

        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
        // Stays exhausted.
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn reset_restores_full_budget() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), 2);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), None);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(60), u32::MAX);
        for _ in 0..100 {
            let delay = backoff.next_delay().unwrap();
            assert!(delay <= Duration::from_secs(60));
        }
    }
}
