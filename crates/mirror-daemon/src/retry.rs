//! Bounded exponential backoff for outbound platform calls.
//!
//! Retries are transparent to the reconcilers: they see only the final
//! success or the final failure after the attempt budget is spent.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry behavior for one platform client.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_factor: f64,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
            max_attempts: 4,
        }
    }
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let delay_secs = config.initial_delay.as_secs_f64()
        * config.backoff_factor.powi(attempt.saturating_sub(1) as i32);
    Duration::from_secs_f64(delay_secs.min(config.max_delay.as_secs_f64()))
}

/// Run `operation`, retrying with backoff until it succeeds or the attempt
/// budget is exhausted. Returns the last error when every attempt failed.
pub async fn with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> std::result::Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_attempts => {
                let delay = backoff_delay(attempt, config);
                warn!(
                    operation = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
