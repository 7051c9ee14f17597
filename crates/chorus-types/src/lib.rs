//! Shared domain types for Chorus.
//!
//! This crate contains the core domain types used across the Chorus
//! orchestration layer: Persona, ChatMessage, GenerationRequest, Directive,
//! the generation error taxonomy, and the tunable configuration surface.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod directive;
pub mod generation;
pub mod message;
pub mod persona;
