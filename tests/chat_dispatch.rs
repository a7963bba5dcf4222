//! Chat dispatch: cache first, canned answers, upstream, fallbacks

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::ScriptedProvider;
use flightdesk::cache::SharedCache;
use flightdesk::canned::{CannedResponder, CannedRule};
use flightdesk::chat::ChatService;
use flightdesk::config::Config;
use flightdesk::failsafe::RetryPolicy;
use flightdesk::protocol::{ChatMessage, ReplySource};
use flightdesk_cache::SimilarityCache;
use pretty_assertions::assert_eq;

const APOLOGY: &str = "Sorry, try again later.";

fn canned() -> CannedResponder {
    CannedResponder::new(vec![
        CannedRule::new(&["baggage"], "Check your airline's baggage policy."),
        CannedRule::new(&["refund"], "Ask the airline for a refund."),
    ])
}

fn service(provider: Arc<ScriptedProvider>, retry: RetryPolicy) -> ChatService {
    ChatService::new(
        SharedCache::new(SimilarityCache::default()),
        canned(),
        provider,
        retry,
        APOLOGY,
    )
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        enabled: true,
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        multiplier: 2.0,
    }
}

#[tokio::test]
async fn test_upstream_answer_is_cached() {
    let provider = ScriptedProvider::answering("BA117 departs at 10:05.");
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());

    let first = chat.reply(&[ChatMessage::user("When does BA117 depart?")]).await;
    assert_eq!(first.source, ReplySource::Upstream);
    assert_eq!(first.response, "BA117 departs at 10:05.");
    assert!(!first.cached);

    let second = chat.reply(&[ChatMessage::user("when does ba117 depart")]).await;
    assert_eq!(second.source, ReplySource::Cache);
    assert!(second.cached);
    assert_eq!(second.response, first.response);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_similar_question_served_from_cache() {
    let provider = ScriptedProvider::answering("R1");
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());

    chat.reply(&[ChatMessage::user("flight")]).await;
    let reply = chat
        .reply(&[ChatMessage::user("What is my flight status")])
        .await;

    assert_eq!(reply.response, "R1");
    assert_eq!(reply.source, ReplySource::Cache);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_canned_answer_skips_upstream_and_is_cached() {
    let provider = ScriptedProvider::answering("unused");
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());

    let reply = chat
        .reply(&[ChatMessage::user("How much baggage can I take?")])
        .await;
    assert_eq!(reply.source, ReplySource::Canned);
    assert_eq!(provider.calls(), 0);
    assert_eq!(chat.cache().len(), 1);

    let again = chat
        .reply(&[ChatMessage::user("How much baggage can I take?")])
        .await;
    assert_eq!(again.source, ReplySource::Cache);
}

#[tokio::test]
async fn test_server_error_returns_apology_without_caching() {
    let provider = ScriptedProvider::failing(500);
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());

    let reply = chat.reply(&[ChatMessage::user("Is it raining in Oslo?")]).await;

    assert_eq!(reply.source, ReplySource::Fallback);
    assert_eq!(reply.response, APOLOGY);
    assert!(chat.cache().is_empty());

    // The failure is retried upstream next time rather than served from cache
    let again = chat.reply(&[ChatMessage::user("Is it raining in Oslo?")]).await;
    assert_eq!(again.source, ReplySource::Fallback);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_failure_falls_back_to_canned_from_earlier_turn() {
    let provider = ScriptedProvider::failing(502);
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());

    let conversation = vec![
        ChatMessage::user("My flight was cancelled, can I get a refund?"),
        ChatMessage::assistant("Which airline?"),
        ChatMessage::user("Norse Atlantic"),
    ];
    let reply = chat.reply(&conversation).await;

    assert_eq!(reply.source, ReplySource::CannedFallback);
    assert_eq!(reply.response, "Ask the airline for a refund.");
    assert!(chat.cache().is_empty());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let provider = ScriptedProvider::new();
    provider.push_status(503);
    provider.push_ok("Gate B12.");
    let chat = service(Arc::clone(&provider), fast_retry(3));

    let reply = chat.reply(&[ChatMessage::user("Which gate for LH400?")]).await;

    assert_eq!(reply.source, ReplySource::Upstream);
    assert_eq!(reply.response, "Gate B12.");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let provider = ScriptedProvider::failing(401);
    let chat = service(Arc::clone(&provider), fast_retry(3));

    let reply = chat.reply(&[ChatMessage::user("Which gate for LH400?")]).await;

    assert_eq!(reply.source, ReplySource::Fallback);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_full_conversation_is_forwarded() {
    let provider = ScriptedProvider::answering("About 2 hours.");
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());

    let conversation = vec![
        ChatMessage::user("I'm flying JFK to MIA"),
        ChatMessage::assistant("Great, how can I help?"),
        ChatMessage::user("How long is the flight time?"),
    ];
    chat.reply(&conversation).await;

    assert_eq!(provider.last_conversation(), Some(conversation));
    // Keyed on the latest user turn only
    assert_eq!(
        chat.cache().snapshot()[0].question,
        "How long is the flight time?"
    );
}

#[tokio::test]
async fn test_disabled_cache_always_goes_upstream() {
    let provider = ScriptedProvider::answering("Sunny.");
    let chat = ChatService::new(
        SharedCache::disabled(),
        CannedResponder::disabled(),
        Arc::clone(&provider) as Arc<dyn flightdesk::provider::ChatProvider>,
        RetryPolicy::disabled(),
        APOLOGY,
    );

    chat.reply(&[ChatMessage::user("Weather in Rome?")]).await;
    chat.reply(&[ChatMessage::user("Weather in Rome?")]).await;
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_from_config_uses_configured_rules_and_apology() {
    let mut config = Config::default();
    config.canned.rules = vec![CannedRule::new(&["lounge"], "Lounges are airside.")];
    config.upstream.apology = "Custom apology".to_string();
    config.retry.enabled = false;

    let provider = ScriptedProvider::failing(500);
    let chat = ChatService::from_config(
        &config,
        SharedCache::from_config(&config.cache),
        provider,
    );

    let canned = chat.reply(&[ChatMessage::user("Where is the lounge?")]).await;
    assert_eq!(canned.source, ReplySource::Canned);

    let fallback = chat.reply(&[ChatMessage::user("What's the time in Tokyo?")]).await;
    assert_eq!(fallback.response, "Custom apology");
}

#[tokio::test]
async fn test_canned_disabled_in_config() {
    let mut config = Config::default();
    config.canned.enabled = false;
    config.retry.enabled = false;

    let provider = ScriptedProvider::answering("Model answer about baggage.");
    let chat = ChatService::from_config(
        &config,
        SharedCache::from_config(&config.cache),
        Arc::clone(&provider) as Arc<dyn flightdesk::provider::ChatProvider>,
    );

    let reply = chat.reply(&[ChatMessage::user("baggage rules?")]).await;
    assert_eq!(reply.source, ReplySource::Upstream);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_blank_query_is_never_cached() {
    let provider = ScriptedProvider::new();
    provider.push_ok("Answer to an assistant-only conversation");
    provider.push_ok("BA117 is 20 minutes late.");
    provider.push_ok("Gate A4.");
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());

    let first = chat
        .reply(&[ChatMessage::assistant("Hi, how can I help?")])
        .await;
    assert_eq!(first.source, ReplySource::Upstream);
    assert!(chat.cache().is_empty());

    let second = chat.reply(&[ChatMessage::user("Is BA117 delayed today?")]).await;
    assert_eq!(second.source, ReplySource::Upstream);
    assert_eq!(second.response, "BA117 is 20 minutes late.");

    let third = chat.reply(&[ChatMessage::user("What gate is LH400 at?")]).await;
    assert_eq!(third.response, "Gate A4.");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_whitespace_query_skips_cache_lookup() {
    let provider = ScriptedProvider::answering("Could you say a bit more?");
    let chat = service(Arc::clone(&provider), RetryPolicy::disabled());
    chat.cache().set("flight", "R1");

    let reply = chat.reply(&[ChatMessage::user("   ")]).await;

    assert_eq!(reply.source, ReplySource::Upstream);
    assert_eq!(chat.cache().len(), 1);
    assert_eq!(chat.cache().stats().unwrap().hits, 0);
}

#[tokio::test]
async fn test_file_backed_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat-cache.json");
    let config = Config::default();

    let provider = ScriptedProvider::answering("Landed at 09:40.");
    let chat = ChatService::new(
        SharedCache::persistent(&config.cache, &path),
        canned(),
        Arc::clone(&provider) as Arc<dyn flightdesk::provider::ChatProvider>,
        RetryPolicy::disabled(),
        APOLOGY,
    );
    chat.reply(&[ChatMessage::user("Has AY5 landed?")]).await;
    assert!(path.exists());

    let restarted = ChatService::new(
        SharedCache::persistent(&config.cache, &path),
        canned(),
        Arc::clone(&provider) as Arc<dyn flightdesk::provider::ChatProvider>,
        RetryPolicy::disabled(),
        APOLOGY,
    );
    let reply = restarted.reply(&[ChatMessage::user("has ay5 landed")]).await;

    assert_eq!(reply.source, ReplySource::Cache);
    assert_eq!(reply.response, "Landed at 09:40.");
    assert_eq!(provider.calls(), 1);
}
