//! Upstream chat completion providers
//!
//! The proxy talks to exactly one provider at a time through the
//! [`ChatProvider`] trait. [`OpenAiCompatibleProvider`] covers OpenAI and the
//! many servers that mimic its `/chat/completions` endpoint.

mod openai;

pub use openai::OpenAiCompatibleProvider;

use async_trait::async_trait;

use crate::Result;
use crate::protocol::ChatMessage;

// ============================================================================
// ChatProvider trait
// ============================================================================

/// A remote model that turns a conversation into one reply.
///
/// Implementations must be `Send + Sync + 'static` so they can be stored in
/// `Arc<dyn ChatProvider>` and shared across request handlers.
#[async_trait]
pub trait ChatProvider: Send + Sync + 'static {
    /// Stable name used in logs
    fn name(&self) -> &str;

    /// Complete the conversation (oldest turn first).
    ///
    /// The provider adds its own system instruction.
    ///
    /// # Errors
    ///
    /// Returns an error for non-2xx responses, network failures and
    /// responses without usable text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}
