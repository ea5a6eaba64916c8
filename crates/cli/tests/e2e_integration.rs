//! End-to-end tests for the Voiceprint agent.
//!
//! These run the real stores, style services, tool catalogue and agent loop
//! against a scripted model, from imported corpus to final reply.

use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use voiceprint_agent::{LoopState, Orchestrator};
use voiceprint_config::AppConfig;
use voiceprint_core::clock::SystemClock;
use voiceprint_core::error::{Error, VoiceError};
use voiceprint_core::event::{DomainEvent, EventBus};
use voiceprint_core::message::{ConversationId, Role};
use voiceprint_core::provider::ProviderResponse;
use voiceprint_core::store::{ConversationStore, Stores};
use voiceprint_core::testing::{
    ScriptedProvider, json_response, text_response, tool_call, tool_call_response,
};
use voiceprint_core::tool::ToolContext;
use voiceprint_memory::{InMemoryStore, import_exemplars};
use voiceprint_style::GenerationRequest;
use voiceprint_tools::VoiceServices;

const CORPUS: &str = r#"{
  "profile": {"display_name": "Dana", "niche": "indie SaaS"},
  "texts": [
    {"id": "p1", "text": "Pricing page broke at 2am. We shipped it anyway. 12 signups by lunch.", "engagement": 410},
    {"id": "p2", "text": "Lost 3 customers this week. Shipped it anyway. Didn't regret it.", "engagement": 380},
    {"id": "p4", "text": "Onboarding took 9 steps. Cut it to 2. We shipped it anyway.", "engagement": 150},
    {"id": "p3", "text": "Building Trailhead in public. Day 40. Still 0 revenue.", "engagement": 220},
    {"id": "p5", "text": "Wrote 3 landing pages. Kept the ugly one. It converts.", "engagement": 90}
  ]
}"#;

fn fingerprint_reply() -> ProviderResponse {
    json_response(json!({
        "hook_patterns": ["Open with what broke", "Lead with a number"],
        "signature_phrases": ["shipped it anyway"],
        "forbidden_phrases": ["robust solution"],
        "avg_sentence_length": 5.0,
        "uses_contractions": true
    }))
}

fn judge(score: u8) -> ProviderResponse {
    json_response(json!({"score": score, "reason": "reads like the exemplars"}))
}

async fn store_with_corpus() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let stored = import_exemplars(store.as_ref(), "dana", CORPUS).await.unwrap();
    assert_eq!(stored, 5);
    store
}

fn services(store: Arc<InMemoryStore>, provider: Arc<ScriptedProvider>, events: Arc<EventBus>) -> VoiceServices {
    VoiceServices::new(
        provider,
        "test-model",
        Stores::from_backend(store),
        &AppConfig::default(),
        Arc::new(SystemClock),
        events,
    )
}

fn has_emoji(text: &str) -> bool {
    text.chars().any(|c| ('\u{1F000}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c))
}

#[tokio::test]
async fn generates_in_voice_from_imported_corpus() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        fingerprint_reply(),
        text_response(
            "Launch day broke everything \u{2014} we shipped it anyway \u{1F680}\n\nLost 3 users. Didn't care.",
        ),
        judge(8),
    ]));
    let store = store_with_corpus().await;
    let services = services(store, provider.clone(), Arc::new(EventBus::default()));

    let content = services
        .pipeline
        .generate(&GenerationRequest::new("dana", "a failed launch"))
        .await
        .unwrap();

    assert!(content.score >= 7, "score {} issues {:?}", content.score, content.issues);
    assert!(!content.regenerated);
    assert!(content.text.contains("shipped it anyway"));
    assert!(!content.text.contains('\u{2014}'));
    assert!(!has_emoji(&content.text));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn forbidden_phrase_scores_zero_and_regenerates_once() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        fingerprint_reply(),
        text_response("We built a robust solution for onboarding. It's fine."),
        text_response("Onboarding broke twice. We shipped it anyway. Lost 2 users. Didn't care."),
        judge(8),
    ]));
    let store = store_with_corpus().await;
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let services = services(store, provider.clone(), events);

    let content = services
        .pipeline
        .generate(&GenerationRequest::new("dana", "onboarding"))
        .await
        .unwrap();

    assert!(content.regenerated);
    assert_eq!(content.score, 8);
    assert_eq!(provider.calls_with_system("# GHOSTWRITER"), 2);
    // The first draft never reached the judge.
    assert_eq!(provider.calls_with_system("# VOICE JUDGE"), 1);
    let retry = &provider.requests()[2];
    assert!(retry.messages[1].content.contains("Uses forbidden phrase \"robust solution\""));

    let mut generated = false;
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::ContentGenerated { regenerated, .. } = event.as_ref() {
            generated = *regenerated;
        }
    }
    assert!(generated);
}

#[tokio::test]
async fn empty_corpus_fails_without_model_calls() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let services = services(
        Arc::new(InMemoryStore::new()),
        provider.clone(),
        Arc::new(EventBus::default()),
    );

    let err = services
        .pipeline
        .generate(&GenerationRequest::new("nobody", "anything"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Voice(VoiceError::NoCorpus { .. })));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn agent_checks_status_then_writes() {
    let draft = "Pricing broke again. We shipped it anyway. 4 refunds. Didn't care.";
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call_response(vec![tool_call("check_user_status", json!({}))], "Checking data first."),
        tool_call_response(
            vec![tool_call("generate_content", json!({"topic": "pricing mistakes"}))],
            "",
        ),
        fingerprint_reply(),
        text_response(draft),
        judge(9),
        text_response(&format!("Here's a draft:\n\n{draft}")),
    ]));
    let store = store_with_corpus().await;
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let services = services(store.clone(), provider.clone(), events.clone());

    let orchestrator = Orchestrator::new(
        provider.clone(),
        "test-model",
        Arc::new(voiceprint_tools::catalogue(&services)),
        store.clone(),
        events,
    );
    let ctx = ToolContext { user_id: "dana".into(), conversation_id: ConversationId::from("conv-1") };

    let outcome = orchestrator
        .respond(&ctx, "Write something about my pricing mistakes", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Finalizing);
    assert_eq!(outcome.iterations, 3);
    assert!(outcome.reply.contains("shipped it anyway"));
    assert_eq!(provider.call_count(), 6);

    let tool_turns = store.recent(&ctx.conversation_id, 0, &[Role::Tool]).await.unwrap();
    assert_eq!(tool_turns.len(), 2);
    assert!(tool_turns[0].content.contains("\"corpus_size\":5"));
    assert!(tool_turns[1].content.contains("\"authenticity_score\":9"));

    let mut executed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::ToolExecuted { tool_name, success, .. } = event.as_ref() {
            executed.push((tool_name.clone(), *success));
        }
    }
    assert_eq!(
        executed,
        vec![("check_user_status".to_string(), true), ("generate_content".to_string(), true)]
    );
}

#[tokio::test]
async fn agent_explains_missing_corpus_instead_of_failing() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call_response(vec![tool_call("generate_content", json!({"topic": "hiring"}))], ""),
        text_response("I need some of your past posts first. Import them and I'll write this."),
    ]));
    let store = Arc::new(InMemoryStore::new());
    let events = Arc::new(EventBus::default());
    let services = services(store.clone(), provider.clone(), events.clone());
    let orchestrator = Orchestrator::new(
        provider.clone(),
        "test-model",
        Arc::new(voiceprint_tools::catalogue(&services)),
        store.clone(),
        events,
    );
    let ctx = ToolContext { user_id: "nobody".into(), conversation_id: ConversationId::from("conv-2") };

    let outcome = orchestrator
        .respond(&ctx, "Write about hiring", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Finalizing);
    assert_eq!(provider.call_count(), 2);
    let tool_turns = store.recent(&ctx.conversation_id, 0, &[Role::Tool]).await.unwrap();
    assert!(tool_turns[0].content.contains("\"status\":\"error\""));
    assert!(tool_turns[0].content.contains("suggested_actions"));
}
