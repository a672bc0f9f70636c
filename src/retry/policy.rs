//! Exponential backoff around fallible async operations

use crate::config::RetryPolicyConfig;
use crate::{ErrorKind, Result, SiftError};
use std::future::Future;
use std::time::Duration;

/// Failures worth another attempt against a busy or flaky provider
pub const TRANSIENT_KINDS: &[ErrorKind] = &[
    ErrorKind::Connection,
    ErrorKind::Timeout,
    ErrorKind::RateLimited,
    ErrorKind::ServerError,
];

/// Transient failures plus an upload that landed in a bad terminal state
pub const UPLOAD_KINDS: &[ErrorKind] = &[
    ErrorKind::Connection,
    ErrorKind::Timeout,
    ErrorKind::RateLimited,
    ErrorKind::ServerError,
    ErrorKind::ResourceState,
];

/// Connection-level failures from the crawl source
///
/// The feed answers throttled queries with 400 or 429, so both are retried.
pub const CONNECTION_KINDS: &[ErrorKind] = &[
    ErrorKind::Connection,
    ErrorKind::Timeout,
    ErrorKind::BadRequest,
    ErrorKind::RateLimited,
];

/// A retry policy: which failures to retry, how often, and how long to wait
///
/// The delay after the n-th failed attempt (0-based) is
/// `clamp(multiplier * 2^n, min, max)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    name: &'static str,
    max_attempts: u32,
    multiplier: Duration,
    min: Duration,
    max: Duration,
    retry_on: &'static [ErrorKind],
    throttle: Option<Duration>,
}

impl RetryPolicy {
    /// Creates a policy from configured constants and a retryable set
    pub fn new(
        name: &'static str,
        config: &RetryPolicyConfig,
        retry_on: &'static [ErrorKind],
    ) -> Self {
        Self {
            name,
            max_attempts: config.max_attempts.max(1),
            multiplier: config.multiplier(),
            min: config.min(),
            max: config.max(),
            retry_on,
            throttle: None,
        }
    }

    /// Policy for uploading a file and waiting for it to become usable
    pub fn upload(config: &RetryPolicyConfig) -> Self {
        Self::new("upload", config, UPLOAD_KINDS)
    }

    /// Policy for model inference calls, throttled before every attempt
    pub fn inference(config: &RetryPolicyConfig, throttle: Duration) -> Self {
        Self::new("inference", config, TRANSIENT_KINDS).with_throttle(throttle)
    }

    /// Policy for crawl-source lookups and downloads
    pub fn network(config: &RetryPolicyConfig) -> Self {
        Self::new("network", config, CONNECTION_KINDS)
    }

    /// Adds a fixed pause before every attempt
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = (!throttle.is_zero()).then_some(throttle);
        self
    }

    /// Computes the sleep after the given 0-based failed attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.multiplier
            .saturating_mul(factor)
            .min(self.max)
            .max(self.min)
    }

    /// Returns true if this policy retries the given error
    pub fn is_retryable(&self, error: &SiftError) -> bool {
        self.retry_on.contains(&error.kind())
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent
    ///
    /// Non-retryable errors are returned as-is. Exhaustion wraps the last error
    /// in `SiftError::RetriesExhausted`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            if let Some(throttle) = self.throttle {
                tokio::time::sleep(throttle).await;
            }
            attempt += 1;

            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !self.is_retryable(&error) {
                return Err(error);
            }

            if attempt >= self.max_attempts {
                tracing::error!(
                    "{}: giving up after {} attempts ({} policy): {}",
                    operation,
                    attempt,
                    self.name,
                    error
                );
                return Err(SiftError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            let delay = self.backoff(attempt - 1);
            tracing::warn!(
                "{}: attempt {}/{} failed ({}), retrying in {:?}",
                operation,
                attempt,
                self.max_attempts,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}
