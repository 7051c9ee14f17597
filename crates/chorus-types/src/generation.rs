//! Generation request/response types for Chorus.
//!
//! These types model the data shapes for upstream text-provider
//! interactions: generation requests, provider configuration, and the
//! classified error taxonomy the retry/breaker machinery keys on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::persona::Language;

/// What triggered a generation, and therefore which degraded-mode text
/// is synthesized when the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationContext {
    /// Spontaneous channel activity (autonomous cycle).
    Activity,
    /// Reaction to something another speaker said.
    Reaction,
    /// Reply to an operator/admin command.
    Operator,
    /// Private one-on-one message.
    PrivateMessage,
}

impl fmt::Display for GenerationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationContext::Activity => write!(f, "activity"),
            GenerationContext::Reaction => write!(f, "reaction"),
            GenerationContext::Operator => write!(f, "operator"),
            GenerationContext::PrivateMessage => write!(f, "private_message"),
        }
    }
}

impl FromStr for GenerationContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "activity" => Ok(GenerationContext::Activity),
            "reaction" => Ok(GenerationContext::Reaction),
            "operator" => Ok(GenerationContext::Operator),
            "private_message" => Ok(GenerationContext::PrivateMessage),
            other => Err(format!("invalid generation context: '{other}'")),
        }
    }
}

/// Request to an upstream text provider.
///
/// Prompt wording is assembled by the transport layer; the core treats it
/// as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub context: GenerationContext,
    /// Language the reply is expected in (sanitizer heuristic input).
    #[serde(default)]
    pub language: Language,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Errors from upstream generation, classified for retry/breaker decisions.
///
/// The classes matter more than the messages:
/// - `Network`: fail fast, no retry, never counts toward the breaker.
/// - `ZeroQuota`: terminal billing/config problem; never retried, never
///   touches the breaker.
/// - `RateLimited` / `Overloaded`: retried with backoff; accumulate in the
///   breaker's sliding window.
/// - `QuotaExhausted`: short-circuits the retry loop and opens the breaker
///   immediately; the fallback chain advances instead of burning attempts.
/// - `SafetyBlocked`: treated as an empty candidate, not retried.
/// - `Malformed`: logged, never retried, never counts.
/// - `Exhausted`: raised only once every provider in the chain has failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenError {
    #[error("network error: {0}")]
    Network(String),

    #[error("zero quota on account: {0}")]
    ZeroQuota(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("quota exhausted (retry after {retry_after_ms:?}ms)")]
    QuotaExhausted { retry_after_ms: Option<u64> },

    #[error("blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("all {providers_tried} providers exhausted")]
    Exhausted { providers_tried: usize },
}

impl GenError {
    /// Whether the retry loop should back off and try this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenError::RateLimited { .. } | GenError::Overloaded(..)
        )
    }

    /// Whether this failure accumulates in the breaker's sliding window.
    pub fn counts_toward_breaker(&self) -> bool {
        matches!(
            self,
            GenError::RateLimited { .. } | GenError::Overloaded(..)
        )
    }

    /// Whether the fallback chain should advance to the next provider.
    ///
    /// Terminal classes (`ZeroQuota`, `Exhausted`) propagate instead.
    pub fn is_failover(&self) -> bool {
        !matches!(self, GenError::ZeroQuota(..) | GenError::Exhausted { .. })
    }
}

/// Capability flags for a configured provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    #[serde(default = "default_true")]
    pub supports_system_prompt: bool,
    #[serde(default)]
    pub supports_long_context: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            supports_system_prompt: true,
            supports_long_context: false,
        }
    }
}

/// Configuration for a single provider in the fallback chain.
///
/// Stateless; loaded at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable name (e.g., "gemini", "openai").
    pub name: String,
    /// Model identifier to request from this provider.
    pub model: String,
    /// Priority for fallback ordering; lower = higher priority.
    pub priority: u32,
    #[serde(default)]
    pub capabilities: ProviderCapabilities,
}

/// Snapshot of breaker/chain state for operational introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderStatusInfo {
    pub name: String,
    pub model: String,
    pub priority: u32,
    /// One of "closed", "open".
    pub circuit_state: String,
    /// Seconds until the circuit closes again, when open.
    pub open_remaining_secs: Option<u64>,
    /// Rate-limit failures currently inside the sliding window.
    pub window_failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_context_roundtrip() {
        for ctx in [
            GenerationContext::Activity,
            GenerationContext::Reaction,
            GenerationContext::Operator,
            GenerationContext::PrivateMessage,
        ] {
            let s = ctx.to_string();
            let parsed: GenerationContext = s.parse().unwrap();
            assert_eq!(ctx, parsed);
        }
    }

    #[test]
    fn test_retryable_classes() {
        assert!(GenError::RateLimited {
            retry_after_ms: None
        }
        .is_retryable());
        assert!(GenError::Overloaded("busy".into()).is_retryable());

        assert!(!GenError::Network("refused".into()).is_retryable());
        assert!(!GenError::ZeroQuota("billing".into()).is_retryable());
        assert!(!GenError::QuotaExhausted {
            retry_after_ms: Some(1000)
        }
        .is_retryable());
        assert!(!GenError::SafetyBlocked("category".into()).is_retryable());
        assert!(!GenError::Malformed("empty body".into()).is_retryable());
    }

    #[test]
    fn test_breaker_counting_classes() {
        assert!(GenError::RateLimited {
            retry_after_ms: Some(10)
        }
        .counts_toward_breaker());
        assert!(GenError::Overloaded("529".into()).counts_toward_breaker());

        // Quota exhaustion opens the breaker through a separate path and
        // must not double-count into the sliding window.
        assert!(!GenError::QuotaExhausted {
            retry_after_ms: None
        }
        .counts_toward_breaker());
        assert!(!GenError::Network("dns".into()).counts_toward_breaker());
        assert!(!GenError::Malformed("truncated json".into()).counts_toward_breaker());
    }

    #[test]
    fn test_failover_classes() {
        assert!(GenError::Network("refused".into()).is_failover());
        assert!(GenError::SafetyBlocked("x".into()).is_failover());
        assert!(!GenError::ZeroQuota("billing disabled".into()).is_failover());
        assert!(!GenError::Exhausted { providers_tried: 3 }.is_failover());
    }

    #[test]
    fn test_gen_error_display() {
        let err = GenError::Exhausted { providers_tried: 2 };
        assert_eq!(err.to_string(), "all 2 providers exhausted");
    }

    #[test]
    fn test_provider_config_serde_defaults() {
        let toml_src = r#"
            name = "gemini"
            model = "gemini-pro"
            priority = 0
        "#;
        let config: ProviderConfig = toml::from_str(toml_src).unwrap();
        assert!(config.capabilities.supports_system_prompt);
        assert!(!config.capabilities.supports_long_context);
    }
}
