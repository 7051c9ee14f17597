//! Deferred side-effect directives extracted from raw model text.
//!
//! A directive is an inline bracketed tag (e.g. `[SEARCH_IMDB: Inception]`)
//! requesting an image, audio clip, or media lookup. Directives live for
//! exactly one sanitization pass: the sanitizer extracts them, the engine
//! resolves them through external media services, and the resolution result
//! is spliced back into the visible text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of side effect a directive requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    ImageGeneration,
    AudioGeneration,
    ImdbSearch,
    VideoSearch,
    TrackSearch,
    Recommendation,
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveKind::ImageGeneration => write!(f, "image_generation"),
            DirectiveKind::AudioGeneration => write!(f, "audio_generation"),
            DirectiveKind::ImdbSearch => write!(f, "imdb_search"),
            DirectiveKind::VideoSearch => write!(f, "video_search"),
            DirectiveKind::TrackSearch => write!(f, "track_search"),
            DirectiveKind::Recommendation => write!(f, "recommendation"),
        }
    }
}

impl FromStr for DirectiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image_generation" => Ok(DirectiveKind::ImageGeneration),
            "audio_generation" => Ok(DirectiveKind::AudioGeneration),
            "imdb_search" => Ok(DirectiveKind::ImdbSearch),
            "video_search" => Ok(DirectiveKind::VideoSearch),
            "track_search" => Ok(DirectiveKind::TrackSearch),
            "recommendation" => Ok(DirectiveKind::Recommendation),
            other => Err(format!("invalid directive kind: '{other}'")),
        }
    }
}

/// One extracted directive, valid for a single sanitization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Payload between the tag name and the closing bracket, trimmed.
    pub payload: String,
    /// Byte offset into the sanitized text where the tag stood; resolution
    /// results are spliced back at this position.
    pub offset: usize,
}

/// Result of resolving a directive through an external media service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResolvedMedia {
    /// A URL to substitute into the visible text.
    Url(String),
    /// Raw media bytes handed to the transport as an attachment; nothing
    /// is substituted into the text.
    Buffer(Vec<u8>),
}
