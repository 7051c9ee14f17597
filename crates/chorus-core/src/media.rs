//! External media collaborators for directive resolution.

use chorus_types::directive::{DirectiveKind, ResolvedMedia};

/// Resolves extracted directives through external services (image and
/// audio generation, catalog searches).
///
/// Each kind is independently optional: `Ok(None)` means "this deployment
/// has no handler for that kind" and the engine degrades to removing the
/// tag. Errors are treated the same way; directive resolution never fails
/// a generation cycle.
pub trait MediaService: Send + Sync {
    fn resolve(
        &self,
        kind: DirectiveKind,
        payload: &str,
    ) -> impl Future<Output = Result<Option<ResolvedMedia>, MediaError>> + Send;
}

/// Media resolution failure. Always non-fatal to the text decision.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media service call failed: {0}")]
    Upstream(String),
}

/// The no-op service for deployments without media integrations. Every
/// directive degrades to tag removal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMedia;

impl MediaService for NoMedia {
    async fn resolve(
        &self,
        _kind: DirectiveKind,
        _payload: &str,
    ) -> Result<Option<ResolvedMedia>, MediaError> {
        Ok(None)
    }
}
