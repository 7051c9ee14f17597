//! BoxTextProvider -- object-safe dynamic dispatch wrapper for TextProvider.
//!
//! 1. Define an object-safe `TextProviderDyn` trait with boxed futures
//! 2. Blanket-impl `TextProviderDyn` for all `T: TextProvider`
//! 3. `BoxTextProvider` wraps `Box<dyn TextProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use chorus_types::generation::{GenError, GenerationRequest, ProviderCapabilities};

use super::provider::TextProvider;

/// Object-safe version of [`TextProvider`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn TextProviderDyn`).
/// A blanket implementation is provided for all types implementing `TextProvider`.
pub trait TextProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn capabilities(&self) -> &ProviderCapabilities;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenError>> + Send + 'a>>;
}

/// Blanket implementation: any `TextProvider` automatically implements `TextProviderDyn`.
impl<T: TextProvider> TextProviderDyn for T {
    fn name(&self) -> &str {
        TextProvider::name(self)
    }

    fn model(&self) -> &str {
        TextProvider::model(self)
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        TextProvider::capabilities(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }
}

/// Type-erased text provider for runtime provider selection.
///
/// Since `TextProvider` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxTextProvider` provides equivalent methods that delegate
/// to the inner `TextProviderDyn` trait object, letting the fallback chain
/// hold a heterogeneous provider list.
pub struct BoxTextProvider {
    inner: Box<dyn TextProviderDyn + Send + Sync>,
}

impl BoxTextProvider {
    /// Wrap a concrete `TextProvider` in a type-erased box.
    pub fn new<T: TextProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Model identifier this provider instance targets.
    pub fn model(&self) -> &str {
        self.inner.model()
    }

    /// What this provider supports.
    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.inner.capabilities()
    }

    /// Generate text for the request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, GenError> {
        self.inner.generate_boxed(request).await
    }
}
