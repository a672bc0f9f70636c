use crate::config::SourceConfig;
use std::time::Duration;

/// Spaces out requests with a base pause plus uniform random jitter
///
/// Jitter keeps the request cadence from looking machine-regular.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    base: Duration,
    jitter: Duration,
}

impl Pacer {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    /// Pacing before feed page fetches and downloads
    pub fn for_requests(config: &SourceConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.jitter_ms),
        )
    }

    /// Pacing before profile and single-post lookups
    pub fn for_lookups(config: &SourceConfig) -> Self {
        Self::new(
            Duration::from_millis(config.lookup_delay_ms),
            Duration::from_millis(config.jitter_ms),
        )
    }

    /// Picks the next delay: `base + uniform(0, jitter)`
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis().min(u64::MAX as u128) as u64;
        self.base + Duration::from_millis(fastrand::u64(0..=jitter_ms))
    }

    /// Sleeps for the next delay
    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::trace!("Pacing for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

/// Session-level backoff used when enumeration keeps hitting rate limits
///
/// Separate from (and longer than) the per-call retry policies: the whole
/// enumeration stops, waits `min(pause * 2^attempt, max_pause)` and then
/// restarts from a fresh cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBackoff {
    pause: Duration,
    max_pause: Duration,
    max_retries: u32,
}

impl SessionBackoff {
    pub fn new(pause: Duration, max_pause: Duration, max_retries: u32) -> Self {
        Self {
            pause,
            max_pause,
            max_retries,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            Duration::from_millis(config.rate_limit_pause_ms),
            Duration::from_millis(config.rate_limit_max_pause_ms),
            config.max_rate_limit_retries,
        )
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Pause length for a 0-based attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.pause.saturating_mul(factor).min(self.max_pause)
    }

    /// Waits out a rate limit
    ///
    /// Returns false without sleeping once `attempt` reaches the retry budget,
    /// telling the caller to stop and keep what it has.
    pub async fn wait(&self, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            tracing::error!("Max rate limit retries ({}) exceeded", self.max_retries);
            return false;
        }

        let delay = self.delay(attempt);
        tracing::warn!(
            "Rate limited (attempt {}/{}), waiting {:?}...",
            attempt + 1,
            self.max_retries,
            delay
        );
        tokio::time::sleep(delay).await;
        true
    }
}
