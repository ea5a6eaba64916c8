//! Generation pipeline: fingerprint → prompt → draft → humanize → validate,
//! with at most one stricter regeneration.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use voiceprint_config::VoiceConfig;
use voiceprint_core::error::{Result, VoiceError};
use voiceprint_core::event::{DomainEvent, EventBus};
use voiceprint_core::provider::{Provider, ProviderRequest};
use voiceprint_core::store::CorpusSource;

use crate::cache::FingerprintCache;
use crate::extractor::select_exemplars;
use crate::humanize::Humanizer;
use crate::prompts;
use crate::validator::{ValidationContext, Validator, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub user_id: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<String>,
}

impl GenerationRequest {
    pub fn new(user_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), topic: topic.into(), angle: None }
    }

    pub fn with_angle(mut self, angle: impl Into<String>) -> Self {
        self.angle = Some(angle.into());
        self
    }
}

/// An accepted text with its final validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub text: String,
    pub score: u8,
    /// Issues found on the returned text (may be non-empty for scores 5–6)
    pub issues: Vec<String>,
    pub regenerated: bool,
}

pub struct GenerationPipeline {
    provider: Arc<dyn Provider>,
    model: String,
    fingerprints: Arc<FingerprintCache>,
    corpus: Arc<dyn CorpusSource>,
    validator: Validator,
    voice: VoiceConfig,
    events: Option<Arc<EventBus>>,
}

impl GenerationPipeline {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        fingerprints: Arc<FingerprintCache>,
        corpus: Arc<dyn CorpusSource>,
        voice: &VoiceConfig,
    ) -> Self {
        let model = model.into();
        Self {
            validator: Validator::new(provider.clone(), model.clone(), voice),
            provider,
            model,
            fingerprints,
            corpus,
            voice: voice.clone(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run the pipeline: two generations and two validations at most.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedContent> {
        let user_id = request.user_id.as_str();
        let angle = request.angle.as_deref();

        let fingerprint = self.fingerprints.get(user_id).await?;
        if !fingerprint.is_complete() {
            return Err(VoiceError::IncompleteFingerprint {
                missing: fingerprint.missing_fields(),
            }
            .into());
        }

        let exemplars =
            select_exemplars(self.corpus.as_ref(), user_id, self.voice.generation_exemplars.max(1))
                .await?;
        if exemplars.is_empty() {
            return Err(VoiceError::NoCorpus { user_id: user_id.to_string() }.into());
        }

        let humanizer = Humanizer::new(&self.voice.lexicon, &fingerprint);
        let system = prompts::generation_system(&fingerprint, &exemplars);
        let ctx = ValidationContext { fingerprint: &fingerprint, exemplars: &exemplars, angle };

        let first_prompt = prompts::generation_user(&request.topic, angle);
        let draft = humanizer.apply(&self.draft(&system, first_prompt).await?);
        let verdict = self.validator.validate(&draft, ctx).await?;

        let (text, verdict, regenerated) =
            if verdict.needs_regeneration(self.voice.regenerate_threshold) {
                info!(
                    user_id,
                    score = verdict.score,
                    issues = verdict.issues.len(),
                    "Draft below threshold, regenerating with stricter prompt"
                );
                let stricter =
                    prompts::stricter_user(&request.topic, angle, &draft, &verdict.issues);
                let second = humanizer.apply(&self.draft(&system, stricter).await?);
                let second_verdict = self.validator.validate(&second, ctx).await?;
                (second, second_verdict, true)
            } else {
                (draft, verdict, false)
            };

        self.finish(user_id, text, verdict, regenerated)
    }

    async fn draft(&self, system: &str, user: String) -> Result<String> {
        let request = ProviderRequest::prompt(&self.model, system, user)
            .with_temperature(self.voice.generation_temperature);
        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }

    fn finish(
        &self,
        user_id: &str,
        text: String,
        verdict: Verdict,
        regenerated: bool,
    ) -> Result<GeneratedContent> {
        if verdict.is_rejected(self.voice.reject_threshold) {
            warn!(user_id, score = verdict.score, issues = ?verdict.issues, "Generated text rejected");
            self.publish(DomainEvent::ContentRejected {
                user_id: user_id.to_string(),
                score: verdict.score,
                issues: verdict.issues.clone(),
                timestamp: Utc::now(),
            });
            return Err(VoiceError::AuthenticityRejected {
                score: verdict.score,
                issues: verdict.issues,
            }
            .into());
        }

        info!(user_id, score = verdict.score, regenerated, "Generated text accepted");
        self.publish(DomainEvent::ContentGenerated {
            user_id: user_id.to_string(),
            score: verdict.score,
            regenerated,
            timestamp: Utc::now(),
        });
        Ok(GeneratedContent { text, score: verdict.score, issues: verdict.issues, regenerated })
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::FingerprintExtractor;
    use chrono::Duration;
    use serde_json::json;
    use voiceprint_core::clock::SystemClock;
    use voiceprint_core::corpus::ExemplarText;
    use voiceprint_core::error::Error;
    use voiceprint_core::provider::ProviderResponse;
    use voiceprint_core::testing::{ScriptedProvider, json_response, text_response};
    use voiceprint_memory::InMemoryStore;

    const GOOD_DRAFT: &str = "Launch day broke everything. We shipped it anyway. Lost 3 users. Didn't care.";

    fn fingerprint_reply() -> ProviderResponse {
        json_response(json!({
            "hook_patterns": ["Open with what broke"],
            "signature_phrases": ["shipped it anyway"],
            "forbidden_phrases": ["robust solution"],
            "avg_sentence_length": 5.0,
            "uses_contractions": true
        }))
    }

    fn judge(score: u8) -> ProviderResponse {
        json_response(json!({"score": score, "reason": "checked"}))
    }

    async fn setup(script: Vec<ProviderResponse>, seed: bool) -> (GenerationPipeline, Arc<ScriptedProvider>) {
        let store = Arc::new(InMemoryStore::new());
        if seed {
            store
                .add_exemplar(ExemplarText {
                    id: "t1".into(),
                    user_id: "u1".into(),
                    text: "Pricing page broke. We shipped it anyway. 12 signups. Didn't matter.".into(),
                    engagement: Some(240.0),
                    published_at: Utc::now(),
                })
                .await;
        }
        let provider = Arc::new(ScriptedProvider::new(script));
        let voice = VoiceConfig::default();
        let extractor = FingerprintExtractor::new(provider.clone(), "m", store.clone(), &voice);
        let cache = Arc::new(FingerprintCache::new(
            store.clone(),
            Arc::new(extractor),
            Arc::new(SystemClock),
            Duration::hours(24),
        ));
        let pipeline = GenerationPipeline::new(provider.clone(), "m", cache, store, &voice);
        (pipeline, provider)
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("u1", "a failed launch")
    }

    #[tokio::test]
    async fn good_first_draft_is_returned() {
        let (pipeline, provider) =
            setup(vec![fingerprint_reply(), text_response(GOOD_DRAFT), judge(9)], true).await;

        let content = pipeline.generate(&request()).await.unwrap();
        assert_eq!(content.text, GOOD_DRAFT);
        assert_eq!(content.score, 9);
        assert!(!content.regenerated);
        assert_eq!(provider.call_count(), 3);

        let draft_request = &provider.requests()[1];
        assert_eq!(draft_request.temperature, 0.9);
        assert!(draft_request.messages[0].content.contains("shipped it anyway"));
    }

    #[tokio::test]
    async fn forbidden_phrase_triggers_exactly_one_regeneration() {
        let (pipeline, provider) = setup(
            vec![
                fingerprint_reply(),
                text_response("We built a robust solution. It's fine."),
                text_response(GOOD_DRAFT),
                judge(8),
            ],
            true,
        )
        .await;

        let content = pipeline.generate(&request()).await.unwrap();
        assert!(content.regenerated);
        assert_eq!(content.score, 8);
        assert_eq!(provider.calls_with_system("# GHOSTWRITER"), 2);
        assert_eq!(provider.calls_with_system("# VOICE JUDGE"), 1);

        let retry = &provider.requests()[2];
        assert!(retry.messages[1].content.contains("Uses forbidden phrase \"robust solution\""));
    }

    #[tokio::test]
    async fn two_bad_drafts_are_rejected() {
        let (pipeline, provider) = setup(
            vec![
                fingerprint_reply(),
                text_response("A robust solution."),
                text_response("Still a robust solution."),
            ],
            true,
        )
        .await;

        let err = pipeline.generate(&request()).await.unwrap_err();
        match err {
            Error::Voice(VoiceError::AuthenticityRejected { score, issues }) => {
                assert_eq!(score, 0);
                assert!(!issues.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(provider.calls_with_system("# GHOSTWRITER"), 2);
    }

    #[tokio::test]
    async fn middling_score_is_returned_with_issues() {
        let (pipeline, _provider) = setup(
            vec![
                fingerprint_reply(),
                text_response(GOOD_DRAFT),
                judge(6),
                text_response(GOOD_DRAFT),
                judge(6),
            ],
            true,
        )
        .await;

        let content = pipeline.generate(&request()).await.unwrap();
        assert_eq!(content.score, 6);
        assert!(content.regenerated);
        assert!(content.issues.iter().any(|i| i.contains("similarity 6/10")));
    }

    #[tokio::test]
    async fn fingerprint_is_extracted_once_across_generations() {
        let (pipeline, provider) = setup(
            vec![
                fingerprint_reply(),
                text_response(GOOD_DRAFT),
                judge(9),
                text_response(GOOD_DRAFT),
                judge(9),
            ],
            true,
        )
        .await;

        pipeline.generate(&request()).await.unwrap();
        pipeline.generate(&request()).await.unwrap();
        assert_eq!(provider.calls_with_system("# STYLE FINGERPRINT"), 1);
    }

    #[tokio::test]
    async fn no_corpus_means_no_model_calls() {
        let (pipeline, provider) = setup(vec![], false).await;
        let err = pipeline.generate(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Voice(VoiceError::NoCorpus { .. })));
        assert_eq!(provider.call_count(), 0);
    }
}
