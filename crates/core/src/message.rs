//! Message and chat-turn domain types.
//!
//! These are the value objects that flow through the system: a session log
//! parses into `ChatTurn`s, the context assembler builds `Message`s from
//! them, and providers translate `Message`s into their wire formats.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

/// A single resolved turn from a session log body.
///
/// Session logs only ever contain user and assistant turns; system prompts
/// come from configuration, not the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One part of a multi-part message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A plain text segment.
    Text { text: String },
    /// An image as a base64 data URI (`data:image/jpeg;base64,...`).
    Image { url: String },
}

/// Message content: a plain string, or structured parts when the bundle
/// carries images. A bundle with exactly one text part and no images
/// collapses to `Text` so providers without multi-part support still work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Build content from parts, collapsing a lone text part to a string.
    pub fn from_parts(mut parts: Vec<ContentPart>) -> Self {
        if parts.len() == 1 {
            if let ContentPart::Text { text } = &parts[0] {
                let text = text.clone();
                return Content::Text(text);
            }
        }
        if parts.is_empty() {
            parts.push(ContentPart::Text {
                text: String::new(),
            });
        }
        Content::Parts(parts)
    }

    /// All text in this content, concatenated. Image parts contribute nothing.
    pub fn text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A single message handed to an LLM provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    /// Create a new user message with plain text content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(content.into()),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(content.into()),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(content.into()),
        }
    }

    /// Create a user message from structured content parts.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: Content::from_parts(parts),
        }
    }
}

impl From<ChatTurn> for Message {
    fn from(turn: ChatTurn) -> Self {
        Self {
            role: turn.role,
            content: Content::Text(turn.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.text(), "Hello!");
    }

    #[test]
    fn lone_text_part_collapses_to_string() {
        let content = Content::from_parts(vec![ContentPart::Text {
            text: "just text".into(),
        }]);
        assert_eq!(content, Content::Text("just text".into()));
    }

    #[test]
    fn image_parts_stay_structured() {
        let content = Content::from_parts(vec![
            ContentPart::Text {
                text: "describe this".into(),
            },
            ContentPart::Image {
                url: "data:image/jpeg;base64,AAAA".into(),
            },
        ]);
        match &content {
            Content::Parts(parts) => assert_eq!(parts.len(), 2),
            Content::Text(_) => panic!("expected structured parts"),
        }
        assert_eq!(content.text(), "describe this");
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, msg);
    }

    #[test]
    fn chat_turn_converts_to_message() {
        let turn = ChatTurn::assistant("Hi there");
        let msg: Message = turn.into();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, Content::Text("Hi there".into()));
    }
}
