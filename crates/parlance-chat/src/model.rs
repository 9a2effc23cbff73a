//! Conversation, message and stored-image types.
//!
//! The serialized shape (`imageUrl`, numeric ids) matches the records the
//! store writes to disk.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Time-ordered conversation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ConversationId)
    }
}

/// Message identifier, unique within its conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    #[serde(default)]
    pub text: String,
    #[serde(
        rename = "imageUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
}

impl Message {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            text: text.into(),
            image_url: None,
        }
    }

    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            text: text.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Non-blank text or attached media.
    pub fn is_meaningful(&self) -> bool {
        !self.text.trim().is_empty() || self.image_url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: ConversationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
        }
    }

    pub fn has_meaningful_messages(&self) -> bool {
        self.messages.iter().any(Message::is_meaningful)
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Title for a conversation started by a typed message:
/// the first six space-separated words followed by `...`.
pub fn derive_title(text: &str) -> String {
    if text.is_empty() {
        return "New Chat".to_string();
    }
    let words: Vec<&str> = text.split(' ').take(6).collect();
    format!("{}...", words.join(" "))
}

/// Title for a conversation started by attaching a generated image.
pub fn image_title(prompt: &str) -> String {
    let source = if prompt.is_empty() {
        "Generated Image"
    } else {
        prompt
    };
    let clipped: String = source.chars().take(30).collect();
    format!("Image: {clipped}")
}

/// One entry of the generated-image log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub prompt: String,
    pub created_at: String,
}

impl StoredImage {
    pub fn new(id: i64, url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            url: url.into(),
            prompt: prompt.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_takes_six_words() {
        assert_eq!(derive_title("hello"), "hello...");
        assert_eq!(
            derive_title("one two three four five six seven eight"),
            "one two three four five six..."
        );
        assert_eq!(derive_title(""), "New Chat");
    }

    #[test]
    fn image_title_clips_prompt() {
        assert_eq!(image_title("a red fox"), "Image: a red fox");
        assert_eq!(image_title(""), "Image: Generated Image");
        let long = "a cinematic sunset over a mountain lake, ultra detailed";
        assert_eq!(image_title(long), "Image: a cinematic sunset over a moun");
    }

    #[test]
    fn meaningful_message_rules() {
        let id = MessageId(1);
        assert!(!Message::assistant(id, "").is_meaningful());
        assert!(!Message::assistant(id, "  \n\t").is_meaningful());
        assert!(Message::assistant(id, "hi").is_meaningful());
        assert!(Message::assistant(id, "").with_image("/img/1.png").is_meaningful());
    }

    #[test]
    fn message_serializes_image_url_in_camel_case() {
        let msg = Message::assistant(MessageId(7), "[IMAGE]").with_image("/img/1.png");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["imageUrl"], "/img/1.png");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["id"], 7);

        let plain = serde_json::to_value(Message::user(MessageId(8), "hey")).unwrap();
        assert!(plain.get("imageUrl").is_none());
    }

    #[test]
    fn conversation_reads_records_without_messages() {
        let conv: Conversation =
            serde_json::from_str(r#"{"id": 1700000000000, "title": "old"}"#).unwrap();
        assert_eq!(conv.id, ConversationId(1_700_000_000_000));
        assert!(conv.messages.is_empty());
        assert!(!conv.has_meaningful_messages());
    }

    #[test]
    fn conversation_id_parses_from_text() {
        let id: ConversationId = " 42\n".parse().unwrap();
        assert_eq!(id, ConversationId(42));
        assert!("abc".parse::<ConversationId>().is_err());
    }
}
