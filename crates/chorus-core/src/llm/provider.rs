//! TextProvider trait definition.
//!
//! This is the core abstraction over upstream AI providers. A provider is
//! an opaque async text function: prompt in, text out, classified errors.
//! Concrete implementations (HTTP clients, local models) live with the
//! embedder; this crate only routes through them.

use chorus_types::generation::{GenError, GenerationRequest, ProviderCapabilities};

/// Trait for upstream text-generation backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). Dynamic
/// dispatch goes through [`super::box_provider::BoxTextProvider`].
pub trait TextProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Model identifier this provider instance targets.
    fn model(&self) -> &str;

    /// What this provider supports.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Generate text for the request.
    ///
    /// Implementations must map upstream failures onto the [`GenError`]
    /// taxonomy; the retry and breaker machinery keys on those classes.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String, GenError>> + Send;
}
