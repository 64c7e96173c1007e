//! Retry backoff policy.

use std::time::Duration;

/// Maps an attempt number to the delay before the next attempt.
///
/// The delay doubles per attempt and never exceeds `cap`, so the sequence is
/// monotonically non-decreasing.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
}

impl Backoff {
    pub const fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay after failed attempt `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl Default for Backoff {
    /// One second, doubling, capped at a minute.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_the_cap() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(backoff.delay(5), Duration::from_secs(32));
        assert_eq!(backoff.delay(6), Duration::from_secs(60));
        assert_eq!(backoff.delay(20), Duration::from_secs(60));
    }

    #[test]
    fn sequence_is_monotonically_non_decreasing() {
        let backoff = Backoff::default();
        let mut prev = Duration::ZERO;
        for attempt in 0..64 {
            let delay = backoff.delay(attempt);
            assert!(delay >= prev, "delay shrank at attempt {attempt}");
            prev = delay;
        }
    }

    #[test]
    fn custom_base_and_cap() {
        let backoff = Backoff::new(Duration::from_millis(250), Duration::from_secs(2));
        assert_eq!(backoff.delay(0), Duration::from_millis(250));
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(4), Duration::from_secs(2));
    }
}
