//! Shared test doubles

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use flightdesk::protocol::ChatMessage;
use flightdesk::provider::ChatProvider;
use flightdesk::{Error, Result};
use parking_lot::Mutex;

/// Provider that replays scripted outcomes and records every call
#[derive(Default)]
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Always answer `text`
    pub fn answering(text: &str) -> Arc<Self> {
        let provider = Self::new();
        for _ in 0..16 {
            provider.push_ok(text);
        }
        provider
    }

    /// Always fail with `status`
    pub fn failing(status: u16) -> Arc<Self> {
        let provider = Self::new();
        for _ in 0..16 {
            provider.push_status(status);
        }
        provider
    }

    pub fn push_ok(&self, text: &str) {
        self.outcomes.lock().push_back(Ok(text.to_string()));
    }

    pub fn push_status(&self, status: u16) {
        self.outcomes.lock().push_back(Err(Error::Upstream {
            status,
            body: "scripted failure".to_string(),
        }));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_conversation(&self) -> Option<Vec<ChatMessage>> {
        self.seen.lock().last().cloned()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(messages.to_vec());
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Internal("script exhausted".to_string())))
    }
}
