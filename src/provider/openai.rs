//! OpenAI-compatible `/chat/completions` client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::ChatProvider;
use crate::config::UpstreamConfig;
use crate::protocol::{ChatMessage, CompletionRequest, CompletionResponse, Role};
use crate::{Error, Result};

/// Upstream error bodies are cut to this many bytes before logging
const MAX_ERROR_BODY: usize = 512;

/// Chat completion client with a static bearer token
pub struct OpenAiCompatibleProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    max_history: usize,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no API key can be resolved, or if the
    /// HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            Error::Config(
                "upstream.api_key is not set (use a literal or env:VAR_NAME)".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_history: config.max_history.max(1),
        })
    }

    /// Full completion endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// System instruction plus the most recent non-system turns
    fn build_messages(&self, conversation: &[ChatMessage]) -> Vec<ChatMessage> {
        let turns: Vec<&ChatMessage> = conversation
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();
        let skip = turns.len().saturating_sub(self.max_history);

        let mut messages = Vec::with_capacity(turns.len() - skip + 1);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(turns.into_iter().skip(skip).cloned());
        messages
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages: self.build_messages(messages),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(endpoint = %self.endpoint, turns = body.messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .first_text()
            .map(ToString::to_string)
            .ok_or_else(|| Error::Protocol("completion had no text content".to_string()))
    }
}
