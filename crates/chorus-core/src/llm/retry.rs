//! Classified-error retry loop with bounded exponential backoff.
//!
//! Only rate-limit/overload failures are retried. Network and zero-quota
//! failures fail fast; quota exhaustion short-circuits the loop immediately
//! so the fallback chain can advance to the next provider instead of
//! burning attempts against a drained account.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use chorus_types::config::RetryConfig;
use chorus_types::generation::GenError;

/// Bounded exponential backoff driver.
///
/// Attempt `k` (1-based) sleeps `base * 2^(k-1)` plus uniform jitter in
/// `[0, jitter_cap)` before attempt `k+1`. The total wall-clock bound is
/// `max_attempts * max_backoff`; there is no cancellation token.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// Returns the last error on exhaustion. A `QuotaExhausted`
    /// classification is surfaced unchanged on the first occurrence --
    /// the caller advances the fallback chain on that sentinel.
    pub async fn execute<T, F, Fut, R>(&self, rng: &mut R, mut op: F) -> Result<T, GenError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenError>>,
        R: Rng + ?Sized,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<GenError> = None;

        for attempt in 1..=max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if !error.is_retryable() {
                        // Network/zero-quota fail fast; quota exhaustion is
                        // the chain-advance sentinel. No backoff for any.
                        tracing::debug!(
                            attempt,
                            error = %error,
                            "Non-retryable generation error"
                        );
                        return Err(error);
                    }

                    if attempt < max_attempts {
                        let delay = self.backoff_delay(attempt, rng);
                        tracing::debug!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Retryable generation error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or(GenError::Malformed(
            "retry loop finished without an error".to_string(),
        )))
    }

    /// Delay before the attempt after `attempt` (1-based).
    fn backoff_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let exp = 1u64
            .checked_shl(attempt - 1)
            .and_then(|shift| self.config.base_delay_ms.checked_mul(shift))
            .unwrap_or(u64::MAX / 2);
        let jitter = if self.config.jitter_cap_ms > 0 {
            rng.random_range(0..self.config.jitter_cap_ms)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }
}
