//! Retry with exponential back-off and jitter for generation calls.
//!
//! [`RetryPolicy::run`] retries transient errors (network failures, 429,
//! 5xx) and returns everything else immediately. The adapter sizes its
//! deadline from the same policy via [`RetryPolicy::max_total_backoff`].

use std::future::Future;
use std::time::Duration;

use sigfuse_core::LlmConfig;

use crate::error::FusionError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 429 and 5xx responses.
///
/// **Not retriable:**
/// - Any other HTTP status, decode failures, empty or invalid payloads,
///   a missing configuration, or the adapter-level timeout.
pub(crate) fn is_retriable(err: &FusionError) -> bool {
    match err {
        FusionError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        FusionError::Status { status, .. } => *status == 429 || (500..600).contains(status),
        FusionError::Deserialize { .. }
        | FusionError::EmptyResponse
        | FusionError::Timeout(_)
        | FusionError::NotConfigured(_)
        | FusionError::InvalidPayload(_) => false,
    }
}

/// Longest single back-off sleep.
const MAX_DELAY_MS: u64 = 30_000;

/// Upper bound of the jitter multiplier applied to each back-off sleep.
const MAX_JITTER: f64 = 1.25;

/// Retry schedule for generation calls.
///
/// Back-off with `backoff_base_ms = 500`:
///
/// | Retry | Sleep before it             |
/// |-------|-----------------------------|
/// | 1     | 500 ms × 2⁰ ± 25 % jitter   |
/// | 2     | 500 ms × 2¹ ± 25 % jitter   |
///
/// Each sleep is capped at 30 s before jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff_base_ms)
    }

    /// Total attempts, the first call included.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        u64::from(self.max_retries) + 1
    }

    /// Sleep before retry number `retry` (1-based), without jitter.
    fn base_delay_ms(&self, retry: u32) -> u64 {
        let shift = retry.saturating_sub(1).min(10);
        self.backoff_base_ms
            .saturating_mul(1u64 << shift)
            .min(MAX_DELAY_MS)
    }

    /// Worst-case time spent sleeping between attempts, jitter included.
    #[must_use]
    pub fn max_total_backoff(&self) -> Duration {
        let total_ms: u64 = (1..=self.max_retries)
            .map(|retry| jittered(self.base_delay_ms(retry), MAX_JITTER))
            .fold(0, u64::saturating_add);
        Duration::from_millis(total_ms)
    }

    /// Runs `operation`, retrying transient errors up to `max_retries` times.
    pub(crate) async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, FusionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FusionError>>,
    {
        let mut retry = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_retriable(&err) || retry >= self.max_retries {
                        return Err(err);
                    }
                    retry += 1;
                    let factor = rand::random::<f64>() * 0.5 + 0.75;
                    let delay_ms = jittered(self.base_delay_ms(retry), factor);
                    tracing::warn!(
                        retry,
                        max_retries = self.max_retries,
                        delay_ms,
                        error = %err,
                        "generation call failed transiently, retrying after back-off"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn jittered(delay_ms: u64, factor: f64) -> u64 {
    (delay_ms as f64 * factor) as u64
}
