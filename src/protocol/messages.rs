//! OpenAI-compatible chat completion wire format

use serde::{Deserialize, Serialize};

use super::types::ChatMessage;

/// `POST {base_url}/chat/completions` body
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    /// Model identifier
    pub model: &'a str,
    /// System instruction followed by the conversation
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion length limit
    pub max_tokens: u32,
}

/// Completion response (only the fields we read)
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Candidate completions
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

/// One candidate completion
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    /// Assistant message
    pub message: CompletionMessage,
}

/// Assistant message inside a choice
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionMessage {
    /// Text; absent for tool-call-only answers
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice, if it has any
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}
