//! Provider routing with failure isolation.
//!
//! - `TextProvider`: RPITIT trait for concrete provider implementations
//! - `BoxTextProvider`: object-safe wrapper for dynamic dispatch
//! - `CircuitBreaker`: process-wide degraded-mode controller
//! - `RetryPolicy`: classified errors + bounded exponential backoff
//! - `FallbackChain`: priority-ordered providers driven through both

pub mod box_provider;
pub mod breaker;
pub mod fallback;
pub mod provider;
pub mod retry;
