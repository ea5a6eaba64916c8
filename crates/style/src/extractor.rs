//! Fingerprint extraction from a user's best texts.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use voiceprint_config::VoiceConfig;
use voiceprint_core::corpus::{CorpusQuery, ExemplarText};
use voiceprint_core::error::{Result, VoiceError};
use voiceprint_core::event::{DomainEvent, EventBus};
use voiceprint_core::fingerprint::StyleFingerprint;
use voiceprint_core::provider::{Provider, ProviderRequest};
use voiceprint_core::store::CorpusSource;

use crate::cache::{Built, SnapshotSource};
use crate::prompts;
use crate::text;

/// Extraction never looks at more than this many texts.
pub const MAX_EXTRACTION_EXEMPLARS: usize = 10;

/// Up to `limit` texts, highest engagement first, topped up with the most recent.
pub async fn select_exemplars(
    corpus: &dyn CorpusSource,
    user_id: &str,
    limit: usize,
) -> Result<Vec<ExemplarText>> {
    let mut texts = corpus.list_exemplars(user_id, CorpusQuery::top(limit)).await?;
    if texts.len() < limit {
        let recent = corpus.list_exemplars(user_id, CorpusQuery::recent(limit)).await?;
        for text in recent {
            if texts.len() >= limit {
                break;
            }
            if !texts.iter().any(|t| t.id == text.id) {
                texts.push(text);
            }
        }
    }
    Ok(texts)
}

/// A generic but complete fingerprint, used when extraction comes back incomplete.
pub fn emergency_fingerprint() -> StyleFingerprint {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    StyleFingerprint {
        hook_patterns: strings(&[
            "Open with a specific moment, number or admission",
            "Lead with the result, explain after",
        ]),
        first_sentences: Vec::new(),
        signature_phrases: strings(&["here's what I learned", "the short version"]),
        forbidden_phrases: strings(&[
            "in today's fast-paced world",
            "let's dive in",
            "game-changer",
            "unlock your potential",
            "robust solution",
        ]),
        avg_sentence_length: 14.0,
        uses_contractions: true,
        uses_fragments: true,
        uses_emoji: false,
        uses_hashtags: false,
        uses_bullet_lists: false,
        bullet_glyph: "-".into(),
        narrative_steps: strings(&["hook", "what happened", "what it taught me", "question"]),
        closing_style: "A direct question to the reader".into(),
    }
}

pub struct FingerprintExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    corpus: Arc<dyn CorpusSource>,
    exemplar_limit: usize,
    temperature: f32,
    events: Option<Arc<EventBus>>,
}

impl FingerprintExtractor {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        corpus: Arc<dyn CorpusSource>,
        voice: &VoiceConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            corpus,
            exemplar_limit: voice.exemplar_limit.clamp(1, MAX_EXTRACTION_EXEMPLARS),
            temperature: voice.extraction_temperature,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Extract a fingerprint. Incomplete model output yields the emergency
    /// default, marked as a fallback.
    pub async fn extract(&self, user_id: &str) -> Result<Built<StyleFingerprint>> {
        let texts = select_exemplars(self.corpus.as_ref(), user_id, self.exemplar_limit).await?;
        if texts.is_empty() {
            return Err(VoiceError::NoCorpus { user_id: user_id.to_string() }.into());
        }

        let request = ProviderRequest::prompt(
            &self.model,
            prompts::EXTRACTION_SYSTEM,
            prompts::extraction_user(&texts),
        )
        .with_temperature(self.temperature)
        .structured();

        let response = self.provider.complete(request).await?;

        let built = match serde_json::from_str::<StyleFingerprint>(text::extract_json(
            &response.message.content,
        )) {
            Ok(fingerprint) if fingerprint.is_complete() => {
                info!(
                    user_id,
                    exemplars = texts.len(),
                    signature_phrases = fingerprint.signature_phrases.len(),
                    forbidden_phrases = fingerprint.forbidden_phrases.len(),
                    "Fingerprint extracted"
                );
                Built::durable(fingerprint)
            }
            Ok(fingerprint) => {
                warn!(
                    user_id,
                    missing = ?fingerprint.missing_fields(),
                    "Extracted fingerprint is incomplete, using emergency default"
                );
                Built::fallback(emergency_fingerprint())
            }
            Err(e) => {
                warn!(user_id, error = %e, "Could not parse fingerprint, using emergency default");
                Built::fallback(emergency_fingerprint())
            }
        };

        if let Some(events) = &self.events {
            events.publish(DomainEvent::FingerprintExtracted {
                user_id: user_id.to_string(),
                exemplars_used: texts.len(),
                fallback: !built.durable,
                timestamp: Utc::now(),
            });
        }

        Ok(built)
    }
}

#[async_trait]
impl SnapshotSource<StyleFingerprint> for FingerprintExtractor {
    async fn build(&self, user_id: &str) -> Result<Built<StyleFingerprint>> {
        self.extract(user_id).await
    }
}
