use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Identifier of a logical conversation (channel, group, or DM thread).
///
/// Opaque to the orchestration layer; the transport decides its shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a message in the conversation window.
///
/// Only `Chat` and `Action` carry speaker-authored text; the rest are
/// transport bookkeeping and are skipped by repetition analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Chat,
    Action,
    System,
    Join,
    Part,
    Quit,
}

impl MessageKind {
    /// Whether this kind carries speaker-authored conversational text.
    pub fn is_conversational(&self) -> bool {
        matches!(self, MessageKind::Chat | MessageKind::Action)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Chat => write!(f, "chat"),
            MessageKind::Action => write!(f, "action"),
            MessageKind::System => write!(f, "system"),
            MessageKind::Join => write!(f, "join"),
            MessageKind::Part => write!(f, "part"),
            MessageKind::Quit => write!(f, "quit"),
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(MessageKind::Chat),
            "action" => Ok(MessageKind::Action),
            "system" => Ok(MessageKind::System),
            "join" => Ok(MessageKind::Join),
            "part" => Ok(MessageKind::Part),
            "quit" => Ok(MessageKind::Quit),
            other => Err(format!("invalid message kind: '{other}'")),
        }
    }
}

/// A single message in the recent conversation window.
///
/// The window is owned by the transport layer and read-only to the
/// orchestration core; the core receives it as a slice ordered oldest
/// to newest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of whoever spoke (persona or human).
    pub speaker: String,
    pub text: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Convenience constructor for a plain chat message.
    pub fn chat(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            kind: MessageKind::Chat,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_roundtrip() {
        for kind in [
            MessageKind::Chat,
            MessageKind::Action,
            MessageKind::System,
            MessageKind::Join,
            MessageKind::Part,
            MessageKind::Quit,
        ] {
            let s = kind.to_string();
            let parsed: MessageKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_conversational_kinds() {
        assert!(MessageKind::Chat.is_conversational());
        assert!(MessageKind::Action.is_conversational());
        assert!(!MessageKind::System.is_conversational());
        assert!(!MessageKind::Join.is_conversational());
    }

    #[test]
    fn test_chat_constructor() {
        let msg = ChatMessage::chat("Nova", "hello there");
        assert_eq!(msg.speaker, "Nova");
        assert_eq!(msg.kind, MessageKind::Chat);
    }

    #[test]
    fn test_channel_id_display() {
        let id = ChannelId::new("lobby");
        assert_eq!(id.to_string(), "lobby");
    }
}
