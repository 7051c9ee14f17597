//! Generation orchestration for the Chorus persona community.
//!
//! This crate is the engineering core of Chorus: it decides which upstream
//! provider answers a request (`llm`), survives provider failures without
//! cascading load (circuit breaker + bounded retry), decides which persona
//! speaks next and keeps the channel from getting repetitive (`speaker`),
//! and sanitizes raw model output before it reaches end users (`sanitize`).
//! The `engine` module wires those pieces into a per-channel generation
//! cycle with an in-flight guard.
//!
//! Chorus is an in-process library: the chat transport, persistent storage,
//! and concrete media providers are collaborators supplied by the embedder.

pub mod clock;
pub mod engine;
pub mod llm;
pub mod media;
pub mod sanitize;
pub mod speaker;
pub mod templates;
