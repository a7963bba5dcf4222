//! Client-facing chat types

use serde::{Deserialize, Serialize};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// The traveller
    User,
    /// The assistant
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Text
    pub content: String,
}

impl ChatMessage {
    /// User turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// System turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// `POST /api/chat` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Prior conversation, oldest first
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Shorthand for appending one more user turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChatRequest {
    /// Conversation with the shorthand `message` folded in as the last user turn
    #[must_use]
    pub fn into_conversation(self) -> Vec<ChatMessage> {
        let mut messages = self.messages;
        if let Some(text) = self.message {
            messages.push(ChatMessage::user(text));
        }
        messages
    }
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Served from the similarity cache
    Cache,
    /// Keyword rule, upstream skipped
    Canned,
    /// Fresh completion from the upstream provider
    Upstream,
    /// Keyword rule after an upstream failure
    CannedFallback,
    /// Generic apology after an upstream failure
    Fallback,
}

/// `POST /api/chat` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Reply text
    pub response: String,
    /// Origin of the reply
    pub source: ReplySource,
    /// Whether the reply came from the cache
    pub cached: bool,
}

impl ChatReply {
    /// Reply from `source`
    pub fn new(response: impl Into<String>, source: ReplySource) -> Self {
        Self {
            response: response.into(),
            source,
            cached: source == ReplySource::Cache,
        }
    }
}

/// Text of the most recent user turn, empty when there is none
#[must_use]
pub fn latest_user_query(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map_or("", |m| m.content.as_str())
}
