//! Chat dispatch: cache, canned answers, upstream, fallbacks
//!
//! One conversation turn resolves in this order:
//!
//! 1. similarity cache lookup on the latest user message
//! 2. canned keyword answer (cached, upstream skipped)
//! 3. upstream completion with retry (cached on success)
//! 4. canned answer from any user turn (not cached)
//! 5. generic apology (not cached)
//!
//! Every path produces text; nothing here fails the caller. A blank query
//! (no user turn, or only whitespace) never reads or writes the cache: under
//! substring matching it would match every stored question.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::SharedCache;
use crate::canned::CannedResponder;
use crate::config::Config;
use crate::failsafe::{RetryPolicy, with_retry};
use crate::protocol::{ChatMessage, ChatReply, ReplySource, latest_user_query};
use crate::provider::ChatProvider;

/// Resolves conversation turns to replies
pub struct ChatService {
    cache: SharedCache,
    canned: CannedResponder,
    provider: Arc<dyn ChatProvider>,
    retry: RetryPolicy,
    apology: String,
}

impl ChatService {
    /// Assemble a service from its collaborators
    pub fn new(
        cache: SharedCache,
        canned: CannedResponder,
        provider: Arc<dyn ChatProvider>,
        retry: RetryPolicy,
        apology: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            canned,
            provider,
            retry,
            apology: apology.into(),
        }
    }

    /// Assemble a service from configuration around an existing cache and provider
    pub fn from_config(
        config: &Config,
        cache: SharedCache,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        let canned = if config.canned.enabled {
            CannedResponder::new(config.canned.rules.clone())
        } else {
            CannedResponder::disabled()
        };
        Self::new(
            cache,
            canned,
            provider,
            RetryPolicy::new(&config.retry),
            config.upstream.apology.clone(),
        )
    }

    /// The cache this service reads and writes
    #[must_use]
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Reply to the latest user turn of `messages`
    pub async fn reply(&self, messages: &[ChatMessage]) -> ChatReply {
        let query = latest_user_query(messages).trim();
        let cacheable = !query.is_empty();

        if cacheable {
            if let Some(cached) = self.cache.lookup(query).await {
                debug!(source = ?ReplySource::Cache, "Chat cache hit");
                return ChatReply::new(cached, ReplySource::Cache);
            }
        }

        if let Some(canned) = self.canned.respond(query) {
            debug!(source = ?ReplySource::Canned, "Canned answer");
            self.cache.store(query, canned).await;
            return ChatReply::new(canned, ReplySource::Canned);
        }

        let started = Instant::now();
        let provider = &self.provider;
        let result =
            with_retry(&self.retry, provider.name(), move || provider.complete(messages)).await;

        match result {
            Ok(text) => {
                info!(
                    provider = %provider.name(),
                    latency_ms = started.elapsed().as_millis(),
                    "Upstream completion"
                );
                if cacheable {
                    self.cache.store(query, &text).await;
                }
                ChatReply::new(text, ReplySource::Upstream)
            }
            Err(e) => {
                warn!(provider = %provider.name(), error = %e, "Upstream completion failed");
                match self.canned.respond_to_conversation(messages) {
                    Some(canned) => ChatReply::new(canned, ReplySource::CannedFallback),
                    None => ChatReply::new(self.apology.clone(), ReplySource::Fallback),
                }
            }
        }
    }
}
