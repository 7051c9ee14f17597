//! Observability setup for Chorus embedders.
//!
//! Structured logging plus optional OpenTelemetry trace export, and the
//! GenAI semantic-convention attribute names used when instrumenting
//! provider calls.

pub mod genai_attrs;
pub mod tracing_setup;
