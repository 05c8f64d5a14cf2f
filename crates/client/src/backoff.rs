//! Retry backoff
//!
//! `attempt` is zero-based: the delay after the first failed attempt is
//! computed with `attempt = 0`.

use std::time::Duration;

use pulse_config::RetryStrategy;
use rand::Rng;

/// Upper bound (exclusive) of the random jitter added to exponential delays
const MAX_JITTER_MS: u64 = 1000;

/// Backoff schedule between delivery attempts
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub strategy: RetryStrategy,
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(strategy: RetryStrategy, base: Duration, max: Duration) -> Self {
        Self {
            strategy,
            base,
            max,
        }
    }

    /// Delay before the next attempt, with random jitter for exponential
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = match self.strategy {
            RetryStrategy::Linear => Duration::ZERO,
            RetryStrategy::Exponential => {
                Duration::from_millis(rand::thread_rng().gen_range(0..MAX_JITTER_MS))
            }
        };
        self.delay_with_jitter(attempt, jitter)
    }

    /// Delay before the next attempt using a fixed jitter
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        let delay = match self.strategy {
            RetryStrategy::Linear => self.base.saturating_mul(attempt.saturating_add(1)),
            RetryStrategy::Exponential => self
                .base
                .saturating_mul(2u32.saturating_pow(attempt))
                .saturating_add(jitter),
        };
        delay.min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_linear_grows_by_base() {
        let backoff = Backoff::new(RetryStrategy::Linear, SECOND, Duration::from_secs(5));
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(3), Duration::from_secs(4));
        assert_eq!(backoff.delay(10), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_doubles_plus_jitter() {
        let backoff = Backoff::new(RetryStrategy::Exponential, SECOND, Duration::from_secs(60));
        let jitter = Duration::from_millis(250);
        assert_eq!(backoff.delay_with_jitter(0, jitter), Duration::from_millis(1250));
        assert_eq!(backoff.delay_with_jitter(1, jitter), Duration::from_millis(2250));
        assert_eq!(backoff.delay_with_jitter(2, jitter), Duration::from_millis(4250));
    }

    #[test]
    fn test_exponential_is_capped() {
        let backoff = Backoff::new(RetryStrategy::Exponential, SECOND, Duration::from_secs(5));
        assert_eq!(backoff.delay_with_jitter(3, Duration::ZERO), Duration::from_secs(5));
        assert_eq!(backoff.delay_with_jitter(40, Duration::ZERO), Duration::from_secs(5));
    }

    #[test]
    fn test_random_jitter_stays_in_range() {
        let backoff = Backoff::new(RetryStrategy::Exponential, SECOND, Duration::from_secs(60));
        for _ in 0..100 {
            let delay = backoff.delay(0);
            assert!(delay >= SECOND);
            assert!(delay < SECOND + Duration::from_millis(MAX_JITTER_MS));
        }
    }
}
