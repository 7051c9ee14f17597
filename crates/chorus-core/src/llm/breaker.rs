//! Process-wide degraded-mode controller.
//!
//! Tracks rate-limit failures in a sliding window and short-circuits all
//! provider traffic while the circuit is open. Quota exhaustion trips the
//! circuit immediately, honoring the provider's retry hint. This is the
//! only state in the orchestration layer that outlives a single request;
//! callers share one breaker behind a mutex.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use chorus_types::config::BreakerConfig;
use chorus_types::generation::GenError;

use crate::clock::{Clock, SystemClock};

/// Circuit state. Mutated only by the breaker; read by the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; failures accumulate in the window.
    Closed,
    /// Providers are bypassed until `expires_at`.
    Open { expires_at: Instant },
}

/// Ordered rate-limit failure timestamps bounded to a rolling interval.
#[derive(Debug)]
struct FailureWindow {
    span: Duration,
    timestamps: VecDeque<Instant>,
}

impl FailureWindow {
    fn new(span: Duration) -> Self {
        Self {
            span,
            timestamps: VecDeque::new(),
        }
    }

    /// Record a failure and drop everything older than the rolling span.
    fn record(&mut self, now: Instant) -> usize {
        self.timestamps.push_back(now);
        self.prune(now);
        self.timestamps.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.duration_since(oldest) > self.span {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.timestamps.len()
    }

    fn clear(&mut self) {
        self.timestamps.clear();
    }
}

/// Process-wide failure-rate tracker that short-circuits providers under
/// sustained failure.
///
/// Clock and RNG are injectable so tests can simulate time and jitter
/// deterministically; there is deliberately no module-level singleton.
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: CircuitState,
    window: FailureWindow,
    clock: Box<dyn Clock>,
    rng: StdRng,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state)
            .field("window_failures", &self.window.len())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a breaker with the system clock and an OS-seeded RNG.
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock_and_rng(config, SystemClock, StdRng::from_os_rng())
    }

    /// Create a breaker with explicit clock and RNG (tests).
    pub fn with_clock_and_rng(
        config: BreakerConfig,
        clock: impl Clock + 'static,
        rng: StdRng,
    ) -> Self {
        let window = FailureWindow::new(Duration::from_secs(config.window_secs));
        Self {
            config,
            state: CircuitState::Closed,
            window,
            clock: Box::new(clock),
            rng,
        }
    }

    /// Record a classified failure.
    ///
    /// Rate-limit/overload failures accumulate in the sliding window and
    /// trip the circuit at the configured threshold. Quota exhaustion trips
    /// immediately regardless of the window count. Everything else is
    /// logged and never counts toward opening.
    pub fn record_failure(&mut self, error: &GenError) {
        let now = self.clock.now();

        if let GenError::QuotaExhausted { retry_after_ms } = error {
            let duration = self.quota_open_duration(*retry_after_ms);
            tracing::warn!(
                open_secs = duration.as_secs(),
                retry_hint_ms = ?retry_after_ms,
                "Quota exhausted, opening circuit immediately"
            );
            self.state = CircuitState::Open {
                expires_at: now + duration,
            };
            return;
        }

        if !error.counts_toward_breaker() {
            tracing::debug!(error = %error, "Failure does not count toward circuit");
            return;
        }

        let count = self.window.record(now);
        if count >= self.config.rate_limit_threshold && !self.open_at(now) {
            tracing::warn!(
                window_failures = count,
                open_secs = self.config.open_secs,
                "Rate-limit failure threshold reached, opening circuit"
            );
            self.state = CircuitState::Open {
                expires_at: now + Duration::from_secs(self.config.open_secs),
            };
        }
    }

    /// Whether the circuit is currently open.
    ///
    /// Auto-closes and clears the failure window once the open period has
    /// expired, so a single check is enough for callers.
    pub fn is_open(&mut self) -> bool {
        let now = self.clock.now();
        if let CircuitState::Open { expires_at } = self.state {
            if now > expires_at {
                tracing::info!("Circuit open period expired, closing");
                self.state = CircuitState::Closed;
                self.window.clear();
                return false;
            }
            return true;
        }
        false
    }

    /// Open the circuit for an explicit duration, bypassing window logic.
    ///
    /// Operational override for recovery after misclassified billing errors
    /// at process start.
    pub fn force_open(&mut self, duration: Duration) {
        let now = self.clock.now();
        tracing::warn!(open_secs = duration.as_secs(), "Circuit forced open");
        self.state = CircuitState::Open {
            expires_at: now + duration,
        };
    }

    /// Close the circuit and clear the failure window, bypassing window logic.
    pub fn force_close(&mut self) {
        tracing::warn!("Circuit forced closed");
        self.state = CircuitState::Closed;
        self.window.clear();
    }

    /// Seconds until the circuit closes again, when open.
    pub fn open_remaining(&self) -> Option<Duration> {
        match self.state {
            CircuitState::Open { expires_at } => {
                Some(expires_at.saturating_duration_since(self.clock.now()))
            }
            CircuitState::Closed => None,
        }
    }

    /// Rate-limit failures currently inside the sliding window.
    pub fn window_failures(&self) -> usize {
        self.window.len()
    }

    fn open_at(&self, now: Instant) -> bool {
        matches!(self.state, CircuitState::Open { expires_at } if now <= expires_at)
    }

    /// `max(floor, hint + jitter)` when a retry hint is parseable, else the
    /// configured default plus jitter.
    fn quota_open_duration(&mut self, retry_after_ms: Option<u64>) -> Duration {
        let jitter = Duration::from_secs(
            self.rng
                .random_range(self.config.quota_jitter_min_secs..=self.config.quota_jitter_max_secs),
        );
        match retry_after_ms {
            Some(hint_ms) => {
                let hinted = Duration::from_millis(hint_ms) + jitter;
                hinted.max(Duration::from_secs(self.config.quota_floor_secs))
            }
            None => Duration::from_secs(self.config.quota_default_secs) + jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn rate_limited() -> GenError {
        GenError::RateLimited {
            retry_after_ms: None,
        }
    }

    fn breaker(clock: &ManualClock) -> CircuitBreaker {
        CircuitBreaker::with_clock_and_rng(
            BreakerConfig::default(),
            clock.clone(),
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_closed_by_default() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);
        assert!(!cb.is_open());
    }

    #[test]
    fn test_opens_at_threshold_within_window() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        for _ in 0..9 {
            cb.record_failure(&rate_limited());
            clock.advance(Duration::from_secs(10));
        }
        assert!(!cb.is_open());

        cb.record_failure(&rate_limited());
        assert!(cb.is_open());
    }

    #[test]
    fn test_window_slides_old_failures_out() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        // 9 failures, then wait past the window so they all expire.
        for _ in 0..9 {
            cb.record_failure(&rate_limited());
        }
        clock.advance(Duration::from_secs(181));

        // 9 more: still only 9 inside the window, circuit stays closed.
        for _ in 0..9 {
            cb.record_failure(&rate_limited());
        }
        assert!(!cb.is_open());
        assert_eq!(cb.window_failures(), 9);
    }

    #[test]
    fn test_scenario_eleven_failures_then_recovery() {
        // 11 rate-limit failures in 170s open the circuit for 300s; a
        // request 200s after the trip is still bypassed; one at 301s is not.
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        for _ in 0..11 {
            cb.record_failure(&rate_limited());
            clock.advance(Duration::from_secs(15));
        }
        assert!(cb.is_open());

        clock.advance(Duration::from_secs(200 - 15));
        assert!(cb.is_open());

        clock.advance(Duration::from_secs(101));
        assert!(!cb.is_open());
        assert_eq!(cb.window_failures(), 0);
    }

    #[test]
    fn test_quota_exhaustion_opens_immediately_with_hint() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        cb.record_failure(&GenError::QuotaExhausted {
            retry_after_ms: Some(90_000),
        });
        assert!(cb.is_open());

        // 90s hint + jitter in [5, 15]s.
        let remaining = cb.open_remaining().unwrap();
        assert!(remaining >= Duration::from_secs(95));
        assert!(remaining <= Duration::from_secs(105));
    }

    #[test]
    fn test_quota_exhaustion_short_hint_floors_at_minimum() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        cb.record_failure(&GenError::QuotaExhausted {
            retry_after_ms: Some(1_000),
        });
        assert!(cb.is_open());
        assert!(cb.open_remaining().unwrap() >= Duration::from_secs(60));
    }

    #[test]
    fn test_quota_exhaustion_without_hint_uses_default() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        cb.record_failure(&GenError::QuotaExhausted {
            retry_after_ms: None,
        });
        let remaining = cb.open_remaining().unwrap();
        assert!(remaining >= Duration::from_secs(125));
        assert!(remaining <= Duration::from_secs(135));
    }

    #[test]
    fn test_non_counting_errors_never_open() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        for _ in 0..50 {
            cb.record_failure(&GenError::Malformed("truncated".into()));
            cb.record_failure(&GenError::Network("refused".into()));
            cb.record_failure(&GenError::SafetyBlocked("category".into()));
        }
        assert!(!cb.is_open());
        assert_eq!(cb.window_failures(), 0);
    }

    #[test]
    fn test_force_open_and_close_bypass_window_logic() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        cb.force_open(Duration::from_secs(600));
        assert!(cb.is_open());

        cb.force_close();
        assert!(!cb.is_open());

        // Forced open ignores the failure count entirely.
        assert_eq!(cb.window_failures(), 0);
    }

    #[test]
    fn test_auto_close_is_strictly_after_expiry() {
        let clock = ManualClock::new();
        let mut cb = breaker(&clock);

        cb.force_open(Duration::from_secs(300));
        clock.advance(Duration::from_secs(300));
        assert!(cb.is_open());

        clock.advance(Duration::from_secs(1));
        assert!(!cb.is_open());
    }
}
