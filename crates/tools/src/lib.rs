//! The tool catalogue for Voiceprint.
//!
//! Each tool gives the orchestrating model one view of the user's data or one
//! action on it: profile and status, voice fingerprint, engagement patterns,
//! top examples, earlier replies, knowledge-map lookups, and generation.
//!
//! Tools never fail silently. When data is missing they answer with a
//! [`Diagnostic`](voiceprint_core::tool::Diagnostic) naming the next step.

mod args;
pub mod diagnose;
pub mod examples;
pub mod fingerprint;
pub mod generate;
pub mod patterns;
pub mod previous_output;
pub mod profile;
pub mod resolve;
pub mod services;

pub use services::VoiceServices;

use voiceprint_core::tool::{Tool, ToolName, ToolRegistry};

fn build_tool(name: ToolName, services: &VoiceServices) -> Box<dyn Tool> {
    let users = services.stores.users.clone();
    match name {
        ToolName::GetUserProfile => Box::new(profile::GetUserProfileTool::new(users)),
        ToolName::CheckUserStatus => Box::new(profile::CheckUserStatusTool::new(users)),
        ToolName::DiagnoseDataGaps => Box::new(diagnose::DiagnoseDataGapsTool::new(users)),
        ToolName::GetVoiceFingerprint => {
            Box::new(fingerprint::GetVoiceFingerprintTool::new(services.clone()))
        }
        ToolName::ReanalyzeCorpus => {
            Box::new(fingerprint::ReanalyzeCorpusTool::new(services.clone()))
        }
        ToolName::GetEngagementPatterns => {
            Box::new(patterns::GetEngagementPatternsTool::new(services.clone()))
        }
        ToolName::RecordPatternSuccess => {
            Box::new(patterns::RecordPatternSuccessTool::new(services.clone()))
        }
        ToolName::GetTopExamples => Box::new(examples::GetTopExamplesTool::new(services.clone())),
        ToolName::GetPreviousOutput => {
            Box::new(previous_output::GetPreviousOutputTool::new(services.clone()))
        }
        ToolName::GenerateContent => Box::new(generate::GenerateContentTool::new(services.clone())),
        ToolName::ResolveReference => Box::new(resolve::ResolveReferenceTool::new(services.clone())),
    }
}

/// A registry holding every tool in [`ToolName::ALL`].
pub fn catalogue(services: &VoiceServices) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for name in ToolName::ALL {
        registry.register(build_tool(name, services));
    }
    tracing::debug!(tools = registry.len(), "Tool catalogue built");
    registry
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::sync::Arc;
    use voiceprint_config::AppConfig;
    use voiceprint_core::clock::SystemClock;
    use voiceprint_core::corpus::ExemplarText;
    use voiceprint_core::event::EventBus;
    use voiceprint_core::message::ConversationId;
    use voiceprint_core::provider::ProviderResponse;
    use voiceprint_core::store::Stores;
    use voiceprint_core::testing::{ScriptedProvider, json_response};
    use voiceprint_core::tool::ToolContext;
    use voiceprint_memory::InMemoryStore;

    use crate::VoiceServices;

    pub const GOOD_DRAFT: &str =
        "Launch day broke everything. We shipped it anyway. Lost 3 users. Didn't care.";

    pub fn ctx() -> ToolContext {
        ToolContext { user_id: "u1".into(), conversation_id: ConversationId::from("c1") }
    }

    pub fn exemplar(id: &str, text: &str, engagement: Option<f64>, days_ago: i64) -> ExemplarText {
        ExemplarText {
            id: id.into(),
            user_id: "u1".into(),
            text: text.into(),
            engagement,
            published_at: Utc::now() - Duration::days(days_ago),
        }
    }

    /// `n` texts `t1..tn`; higher numbers have more engagement.
    pub async fn seeded_store(n: usize) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for i in 1..=n {
            store
                .add_exemplar(exemplar(
                    &format!("t{i}"),
                    &format!(
                        "Building Trailhead in public.\nWe shipped it anyway. Lost {i} users. Didn't care."
                    ),
                    Some(i as f64 * 10.0),
                    i as i64,
                ))
                .await;
        }
        store
    }

    pub fn fingerprint_reply() -> ProviderResponse {
        json_response(json!({
            "hook_patterns": ["Open with what broke"],
            "signature_phrases": ["shipped it anyway"],
            "forbidden_phrases": ["robust solution"],
            "avg_sentence_length": 5.0,
            "uses_contractions": true
        }))
    }

    pub fn judge(score: u8) -> ProviderResponse {
        json_response(json!({"score": score, "reason": "checked"}))
    }

    pub fn services(store: Arc<InMemoryStore>, provider: Arc<ScriptedProvider>) -> VoiceServices {
        VoiceServices::new(
            provider,
            "test-model",
            Stores::from_backend(store),
            &AppConfig::default(),
            Arc::new(SystemClock),
            Arc::new(EventBus::default()),
        )
    }
}
