use std::time::Duration;

use crate::providers::ProviderError;

/// Statuses treated as transient upstream overload.
pub const DEFAULT_RETRY_STATUSES: [u16; 3] = [502, 503, 504];

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after.
    pub base_delay: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based): `base_delay * 2^retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Transport failures and the configured statuses are retried. The
    /// service's bad-request marker never is.
    pub fn is_retryable(&self, error: &ProviderError) -> bool {
        if error.is_bad_request() {
            return false;
        }
        if error.is_transport() {
            return true;
        }
        error
            .status()
            .is_some_and(|status| self.retry_statuses.contains(&status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{BadRequestSnafu, StatusSnafu};

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn only_listed_statuses_are_retried() {
        let policy = RetryPolicy::default();
        let unavailable = StatusSnafu { status: 503u16, body: "" }.build();
        let not_found = StatusSnafu { status: 404u16, body: "" }.build();
        let bad = BadRequestSnafu { message: "Bad request 400" }.build();

        assert!(policy.is_retryable(&unavailable));
        assert!(!policy.is_retryable(&not_found));
        assert!(!policy.is_retryable(&bad));
    }
}
