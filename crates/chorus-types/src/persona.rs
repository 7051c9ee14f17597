use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a persona, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(pub Uuid);

impl PersonaId {
    /// Create a new PersonaId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a PersonaId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PersonaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Language a persona writes in, or a conversation is held in.
///
/// Carried as a lowercase ISO 639-1 code on the wire. `English` is the
/// documented default everywhere a language lookup misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "pt")]
    Portuguese,
}

impl Language {
    /// Lowercase ISO 639-1 code for this language.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Portuguese => "pt",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" => Ok(Language::English),
            "es" => Ok(Language::Spanish),
            "fr" => Ok(Language::French),
            "de" => Ok(Language::German),
            "pt" => Ok(Language::Portuguese),
            other => Err(format!("invalid language code: '{other}'")),
        }
    }
}

/// Behavioral trait tags used for time-of-day selection weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaTrait {
    Creative,
    Nocturnal,
    Energetic,
    Introspective,
    Analytical,
    Playful,
}

impl fmt::Display for PersonaTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaTrait::Creative => write!(f, "creative"),
            PersonaTrait::Nocturnal => write!(f, "nocturnal"),
            PersonaTrait::Energetic => write!(f, "energetic"),
            PersonaTrait::Introspective => write!(f, "introspective"),
            PersonaTrait::Analytical => write!(f, "analytical"),
            PersonaTrait::Playful => write!(f, "playful"),
        }
    }
}

impl FromStr for PersonaTrait {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creative" => Ok(PersonaTrait::Creative),
            "nocturnal" => Ok(PersonaTrait::Nocturnal),
            "energetic" => Ok(PersonaTrait::Energetic),
            "introspective" => Ok(PersonaTrait::Introspective),
            "analytical" => Ok(PersonaTrait::Analytical),
            "playful" => Ok(PersonaTrait::Playful),
            other => Err(format!("invalid persona trait: '{other}'")),
        }
    }
}

/// Writing-style attributes for a persona, on a 0-10 scale each.
///
/// These modulate template selection (terminal fallbacks, sanitizer
/// replacements), never the selection algorithm itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechStyle {
    /// 0 = slang-heavy, 10 = formal register.
    #[serde(default = "default_style_level")]
    pub formality: u8,
    /// 0 = terse one-liners, 10 = long-winded.
    #[serde(default = "default_style_level")]
    pub verbosity: u8,
    /// 0 = dry, 10 = constant jokes.
    #[serde(default = "default_style_level")]
    pub humor: u8,
    /// 0 = never, 10 = emoji in every message.
    #[serde(default = "default_style_level")]
    pub emoji_usage: u8,
}

fn default_style_level() -> u8 {
    5
}

impl Default for SpeechStyle {
    fn default() -> Self {
        Self {
            formality: 5,
            verbosity: 5,
            humor: 5,
            emoji_usage: 5,
        }
    }
}

impl SpeechStyle {
    /// Whether this persona leans on emoji (threshold 7 of 10).
    pub fn emoji_heavy(&self) -> bool {
        self.emoji_usage >= 7
    }

    /// Whether this persona keeps messages short (threshold 3 of 10).
    pub fn terse(&self) -> bool {
        self.verbosity <= 3
    }
}

/// A simulated chat participant.
///
/// Personas are externally owned and immutable for the duration of one
/// generation cycle. The orchestration layer only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    /// Display name as it appears in chat (also matched against
    /// `ChatMessage.speaker` for cooldown tracking).
    pub name: String,
    /// Language this persona primarily writes in.
    pub primary_language: Language,
    /// Additional languages this persona can follow.
    #[serde(default)]
    pub secondary_languages: Vec<Language>,
    #[serde(default)]
    pub style: SpeechStyle,
    /// Trait tags consulted by time-of-day selection weighting.
    #[serde(default)]
    pub traits: Vec<PersonaTrait>,
    pub created_at: DateTime<Utc>,
}

impl Persona {
    /// Whether this persona carries the given trait tag.
    pub fn has_trait(&self, t: PersonaTrait) -> bool {
        self.traits.contains(&t)
    }

    /// Whether this persona speaks the given language (primary or secondary).
    pub fn speaks(&self, language: Language) -> bool {
        self.primary_language == language || self.secondary_languages.contains(&language)
    }
}
