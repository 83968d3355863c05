//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a failed attempt is retryable
//! - Enforce the bounded retry count (initial attempt + `max_retries`)
//! - Compute the delay before the next attempt
//!
//! # Design Decisions
//! - Every method is retried: the journal, not idempotency, protects writes
//! - Connection errors and HTTP failures are retryable; malformed requests are not
//! - The default policy retries immediately (no backoff)
//! - A non-zero base delay doubles per retry up to the ceiling, plus up to a
//!   tenth of random spread

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::transport::TransportError;

/// Bounded retry policy for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries `max_retries` times without waiting.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Total number of physical calls allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether attempt number `attempt` (1-based) may be followed by another.
    pub fn should_retry(&self, attempt: u32, error: &TransportError) -> bool {
        attempt < self.max_attempts() && error.is_retryable()
    }

    /// Delay before retry number `retry` (1-based). Zero when no base delay is set.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 || self.base_delay_ms == 0 {
            return Duration::ZERO;
        }

        let factor = 1u64.checked_shl(retry - 1).unwrap_or(u64::MAX);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        let spread = delay_ms / 10;
        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=spread)
        };
        Duration::from_millis(delay_ms + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unavailable() -> TransportError {
        TransportError::Http {
            status: 503,
            body: String::new(),
        }
    }

    #[test]
    fn test_default_allows_three_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.should_retry(1, &unavailable()));
        assert!(policy.should_retry(2, &unavailable()));
        assert!(!policy.should_retry(3, &unavailable()));
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_invalid_request_is_not_retried() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(1, &TransportError::InvalidRequest("bad route".into())));
        assert!(policy.should_retry(1, &TransportError::Connect("refused".into())));
    }

    #[test]
    fn test_delay_doubles_up_to_the_ceiling() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay_ms: 100,
            max_delay_ms: 1000,
        };
        let ms = |retry| policy.delay_for(retry).as_millis() as u64;

        assert!((100..=110).contains(&ms(1)));
        assert!((200..=220).contains(&ms(2)));
        assert!((400..=440).contains(&ms(3)));
        assert!((1000..=1100).contains(&ms(10)));
        assert!((1000..=1100).contains(&ms(80)));
    }

    #[test]
    fn test_zero_base_delay_is_immediate() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 0,
            max_delay_ms: 1000,
        };
        for retry in 0..5 {
            assert_eq!(policy.delay_for(retry), Duration::ZERO);
        }
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy::immediate(0);
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(1, &unavailable()));
    }
}
