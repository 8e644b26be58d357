//! Retry policies used by [`rattler_cache`](https://docs.rs/rattler_cache)'s
//! fetch action when a download fails transiently.
//!
//! This re-exports the building blocks from the `retry-policies` crate under
//! the names the rest of the rattler ecosystem expects, plus a
//! [`DoNotRetryPolicy`] for callers that want a single attempt.

use std::time::SystemTime;

pub use retry_policies::{RetryDecision, RetryPolicy};

/// A retry policy that never retries; the first failure is final.
///
/// Useful for tests and for callers that implement their own retry loop
/// above the cache (e.g. an outer installer retrying a whole batch).
#[derive(Debug, Clone, Copy, Default)]
pub struct DoNotRetryPolicy;

impl RetryPolicy for DoNotRetryPolicy {
    fn should_retry(&self, _request_start_time: SystemTime, _n_past_retries: u32) -> RetryDecision {
        RetryDecision::DoNotRetry
    }
}

/// Builds an [`retry_policies::policies::ExponentialBackoff`] policy, mirroring the
/// convenience constructor `rattler_networking` exposes upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialBackoffBuilder {
    min_retry_interval: Option<std::time::Duration>,
    max_retry_interval: Option<std::time::Duration>,
}

impl ExponentialBackoffBuilder {
    /// Sets the minimum interval between the first and second attempt.
    pub fn min_retry_interval(mut self, interval: std::time::Duration) -> Self {
        self.min_retry_interval = Some(interval);
        self
    }

    /// Sets the maximum interval between any two attempts.
    pub fn max_retry_interval(mut self, interval: std::time::Duration) -> Self {
        self.max_retry_interval = Some(interval);
        self
    }

    /// Builds a policy that retries up to `max_n_retries` times.
    pub fn build_with_max_retries(
        self,
        max_n_retries: u32,
    ) -> retry_policies::policies::ExponentialBackoff {
        let mut builder = retry_policies::policies::ExponentialBackoff::builder();
        if let Some(min) = self.min_retry_interval {
            builder = builder.retry_bounds(min, self.max_retry_interval.unwrap_or(min * 32));
        }
        builder.build_with_max_retries(max_n_retries)
    }
}
