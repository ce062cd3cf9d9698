//! Retry policy with exponential backoff for identity provider calls.
//!
//! Retries only transient failures: transport errors (connection failures,
//! timeouts) and 5xx or 429 responses. Every other 4xx is returned
//! immediately; a wrong password must never be retried.

use std::time::Duration;

/// Default number of retries after the initial request.
const MAX_RETRIES: u32 = 3;

/// Default base delay between retries (doubles each retry: 2s, 4s, 8s).
const BASE_DELAY: Duration = Duration::from_secs(2);

/// How often and how patiently a failed call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; each later retry doubles it.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Default retry count with a custom base delay.
    pub fn with_base_delay(base_delay: Duration) -> Self {
        Self {
            base_delay,
            ..Self::default()
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Whether an HTTP status is worth retrying.
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
