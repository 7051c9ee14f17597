//! Multi-provider fallback chain.
//!
//! Routes generation requests through multiple providers with automatic
//! failover. Providers are tried in priority order, each call driven
//! through the retry policy. While the circuit breaker is open no provider
//! is called at all: the chain returns locally synthesized degraded text
//! tagged by generation context.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;

use chorus_types::config::RetryConfig;
use chorus_types::generation::{GenError, GenerationRequest, ProviderConfig, ProviderStatusInfo};

use super::box_provider::BoxTextProvider;
use super::breaker::CircuitBreaker;
use super::retry::RetryPolicy;
use crate::templates;

/// Result of a generation through the fallback chain.
#[derive(Debug)]
pub struct ChainResult {
    pub text: String,
    /// Name of the provider that produced the text, or `None` when the
    /// text was synthesized locally in degraded mode.
    pub provider_name: Option<String>,
}

impl ChainResult {
    /// Whether this text was synthesized locally without a provider call.
    pub fn is_degraded(&self) -> bool {
        self.provider_name.is_none()
    }
}

/// Priority-ordered providers driven through retry policy and breaker.
///
/// The breaker is shared (`Arc<Mutex<..>>`) because its state is
/// process-wide: every chain and operator surface sees the same circuit.
pub struct FallbackChain {
    providers: Vec<(ProviderConfig, BoxTextProvider)>,
    breaker: Arc<Mutex<CircuitBreaker>>,
    retry: RetryPolicy,
    rng: StdRng,
}

impl FallbackChain {
    /// Build a chain from configured providers, sorted by priority
    /// (ascending, name as the tiebreak).
    pub fn new(
        mut providers: Vec<(ProviderConfig, BoxTextProvider)>,
        breaker: Arc<Mutex<CircuitBreaker>>,
        retry_config: RetryConfig,
    ) -> Self {
        providers.sort_by(|(a, _), (b, _)| {
            a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name))
        });
        Self {
            providers,
            breaker,
            retry: RetryPolicy::new(retry_config),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the chain's RNG (tests).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Shared handle to the process-wide breaker (operator overrides).
    pub fn breaker(&self) -> Arc<Mutex<CircuitBreaker>> {
        Arc::clone(&self.breaker)
    }

    /// Snapshot of chain and breaker state for operational introspection.
    pub fn status(&self) -> Vec<ProviderStatusInfo> {
        let breaker = self.breaker.lock().expect("breaker lock poisoned");
        let open_remaining = breaker.open_remaining();
        let window_failures = breaker.window_failures();
        let circuit_state = if open_remaining.is_some() {
            "open"
        } else {
            "closed"
        };

        self.providers
            .iter()
            .map(|(config, _)| ProviderStatusInfo {
                name: config.name.clone(),
                model: config.model.clone(),
                priority: config.priority,
                circuit_state: circuit_state.to_string(),
                open_remaining_secs: open_remaining.map(|d| d.as_secs()),
                window_failures,
            })
            .collect()
    }

    /// Send a request through the fallback chain.
    ///
    /// Tries providers in priority order. Failover-class errors record into
    /// the breaker and advance to the next provider; terminal classes
    /// (`ZeroQuota`) propagate immediately. The first non-empty text wins;
    /// empty responses advance too. When every provider has failed the
    /// chain raises `Exhausted` -- callers substitute a persona-flavored
    /// template (user-triggered) or silence (autonomous), never the raw
    /// error.
    pub async fn generate(
        &mut self,
        request: &GenerationRequest,
    ) -> Result<ChainResult, GenError> {
        // Openness is checked once per request: a breaker trip recorded
        // mid-traversal (quota exhaustion on the primary) must not stop this
        // request from advancing to the remaining providers.
        if self
            .breaker
            .lock()
            .expect("breaker lock poisoned")
            .is_open()
        {
            tracing::info!(
                context = %request.context,
                "Circuit open, synthesizing degraded text without provider call"
            );
            return Ok(ChainResult {
                text: templates::degraded_line(request.context).to_string(),
                provider_name: None,
            });
        }

        let mut providers_tried = 0usize;

        for (config, provider) in &self.providers {
            providers_tried += 1;
            let result = self
                .retry
                .execute(&mut self.rng, || provider.generate(request))
                .await;

            match result {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::debug!(
                        provider = %config.name,
                        model = %config.model,
                        chars = text.len(),
                        "Provider produced text"
                    );
                    return Ok(ChainResult {
                        text,
                        provider_name: Some(config.name.clone()),
                    });
                }
                Ok(_) => {
                    tracing::warn!(
                        provider = %config.name,
                        "Provider returned empty text, trying next in chain"
                    );
                }
                Err(error) => {
                    if !error.is_failover() {
                        tracing::error!(
                            provider = %config.name,
                            error = %error,
                            "Terminal error, returning immediately"
                        );
                        return Err(error);
                    }

                    tracing::warn!(
                        provider = %config.name,
                        error = %error,
                        "Provider failed, trying next in chain"
                    );
                    self.breaker
                        .lock()
                        .expect("breaker lock poisoned")
                        .record_failure(&error);
                }
            }
        }

        Err(GenError::Exhausted { providers_tried })
    }
}
