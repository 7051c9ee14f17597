//! Raw output sanitization and directive extraction.
//!
//! `ResponseSanitizer` runs the validation pipeline; `directive::extract`
//! is the single-pass tag scanner it delegates to.

pub mod directive;
pub mod sanitizer;

pub use directive::Extraction;
pub use sanitizer::{DiscardReason, ResponseSanitizer, SanitizeOutcome};
