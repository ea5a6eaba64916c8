//! Engagement patterns: discovery from top texts, and success-rate learning.

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use voiceprint_core::clock::Clock;
use voiceprint_core::corpus::{CorpusQuery, Pattern, PatternType};
use voiceprint_core::error::{Result, StoreError};
use voiceprint_core::provider::{Provider, ProviderRequest};
use voiceprint_core::store::{CorpusSource, PatternStore};

use crate::prompts;
use crate::text;

/// Success rate given to a newly discovered pattern.
pub const INITIAL_SUCCESS_RATE: f64 = 0.5;

const MAX_SLUG: usize = 48;

/// Moves a pattern's success rate toward 1.0 each time it is confirmed.
pub struct PatternLearner {
    store: Arc<dyn PatternStore>,
    rate: f64,
}

impl PatternLearner {
    pub fn new(store: Arc<dyn PatternStore>, rate: f64) -> Self {
        Self { store, rate: rate.clamp(0.0, 1.0) }
    }

    /// `success_rate += rate * (1 - success_rate)`; returns the updated pattern.
    pub async fn reinforce(&self, pattern_id: &str) -> Result<Pattern> {
        let pattern = self
            .store
            .get_pattern(pattern_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("pattern {pattern_id}")))?;

        let delta = self.rate * (1.0 - pattern.success_rate);
        self.store.bump_success_rate(pattern_id, delta).await?;

        let updated = self
            .store
            .get_pattern(pattern_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("pattern {pattern_id}")))?;
        info!(
            pattern_id,
            from = pattern.success_rate,
            to = updated.success_rate,
            uses = updated.usage_count,
            "Pattern reinforced"
        );
        Ok(updated)
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisReply {
    #[serde(default)]
    patterns: Vec<RawPattern>,
}

#[derive(Debug, Deserialize)]
struct RawPattern {
    #[serde(rename = "type")]
    kind: String,
    description: String,
    #[serde(default)]
    source_ids: Vec<String>,
}

/// Stable id from the description, so re-analysis updates rather than duplicates.
fn pattern_id(user_id: &str, kind: PatternType, description: &str) -> String {
    let mut slug = String::new();
    for word in description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if slug.len() + word.len() + 1 > MAX_SLUG {
            break;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&word.to_lowercase());
    }
    format!("{user_id}:{}:{slug}", kind.as_str())
}

/// Asks the model what drove engagement in the user's top texts.
pub struct PatternAnalyzer {
    provider: Arc<dyn Provider>,
    model: String,
    corpus: Arc<dyn CorpusSource>,
    store: Arc<dyn PatternStore>,
    clock: Arc<dyn Clock>,
    exemplar_limit: usize,
}

impl PatternAnalyzer {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        corpus: Arc<dyn CorpusSource>,
        store: Arc<dyn PatternStore>,
        clock: Arc<dyn Clock>,
        exemplar_limit: usize,
    ) -> Self {
        Self { provider, model: model.into(), corpus, store, clock, exemplar_limit }
    }

    /// Discover and store patterns. Texts without engagement data are skipped;
    /// with none left, nothing is analysed. An unreadable reply is logged and
    /// yields no patterns.
    pub async fn analyze(&self, user_id: &str) -> Result<Vec<Pattern>> {
        let texts = self
            .corpus
            .list_exemplars(user_id, CorpusQuery::top(self.exemplar_limit))
            .await?;
        if texts.is_empty() {
            info!(user_id, "No engagement data, skipping pattern analysis");
            return Ok(Vec::new());
        }

        let request =
            ProviderRequest::prompt(&self.model, prompts::PATTERN_SYSTEM, prompts::pattern_user(&texts))
                .with_temperature(0.2)
                .structured();
        let response = self.provider.complete(request).await?;

        let reply = match serde_json::from_str::<AnalysisReply>(text::extract_json(
            &response.message.content,
        )) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(user_id, error = %e, "Could not parse pattern analysis");
                return Ok(Vec::new());
            }
        };

        let known_ids: HashSet<&str> = texts.iter().map(|t| t.id.as_str()).collect();
        let now = self.clock.now();
        let mut stored = Vec::new();

        for raw in reply.patterns {
            let Some(kind) = PatternType::parse(raw.kind.trim().to_lowercase().as_str()) else {
                warn!(user_id, kind = %raw.kind, "Skipping pattern of unknown type");
                continue;
            };
            let description = raw.description.trim();
            if description.is_empty() {
                continue;
            }

            let id = pattern_id(user_id, kind, description);
            let previous = self.store.get_pattern(&id).await?;
            let pattern = Pattern {
                id,
                user_id: user_id.to_string(),
                kind,
                description: description.to_string(),
                source_ids: raw
                    .source_ids
                    .into_iter()
                    .filter(|s| known_ids.contains(s.as_str()))
                    .collect(),
                success_rate: previous.as_ref().map_or(INITIAL_SUCCESS_RATE, |p| p.success_rate),
                usage_count: previous.as_ref().map_or(0, |p| p.usage_count),
                updated_at: now,
            };
            self.store.upsert_pattern(pattern.clone()).await?;
            stored.push(pattern);
        }

        info!(user_id, patterns = stored.len(), "Engagement patterns analysed");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use voiceprint_core::clock::SystemClock;
    use voiceprint_core::corpus::{ExemplarText, PatternQuery};
    use voiceprint_core::error::Error;
    use voiceprint_core::testing::{ScriptedProvider, json_response, text_response};
    use voiceprint_memory::InMemoryStore;

    fn pattern(id: &str, rate: f64) -> Pattern {
        Pattern {
            id: id.into(),
            user_id: "u1".into(),
            kind: PatternType::Hook,
            description: "Open with a number".into(),
            source_ids: vec![],
            success_rate: rate,
            usage_count: 0,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reinforce_moves_toward_one() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_pattern(pattern("p1", 0.5)).await.unwrap();
        let learner = PatternLearner::new(store.clone(), 0.2);

        let p = learner.reinforce("p1").await.unwrap();
        assert!((p.success_rate - 0.6).abs() < 1e-9);
        assert_eq!(p.usage_count, 1);

        let p = learner.reinforce("p1").await.unwrap();
        assert!((p.success_rate - 0.68).abs() < 1e-9);
        assert!(p.success_rate < 1.0);
    }

    #[tokio::test]
    async fn reinforce_unknown_pattern_is_not_found() {
        let learner = PatternLearner::new(Arc::new(InMemoryStore::new()), 0.2);
        let err = learner.reinforce("missing").await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn ids_are_stable_slugs() {
        assert_eq!(
            pattern_id("u1", PatternType::Hook, "Opens with a number, then a confession!"),
            "u1:hook:opens-with-a-number-then-a-confession"
        );
    }

    async fn seeded() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_exemplar(ExemplarText {
                id: "t1".into(),
                user_id: "u1".into(),
                text: "We lost 40% of signups.".into(),
                engagement: Some(300.0),
                published_at: Utc::now(),
            })
            .await;
        store
    }

    fn analyzer(provider: Arc<ScriptedProvider>, store: Arc<InMemoryStore>) -> PatternAnalyzer {
        PatternAnalyzer::new(provider, "m", store.clone(), store, Arc::new(SystemClock), 10)
    }

    #[tokio::test]
    async fn analysis_stores_patterns_and_keeps_learned_rates() {
        let reply = json!({"patterns": [
            {"type": "hook", "description": "Opens with a hard number", "source_ids": ["t1", "bogus"]},
            {"type": "vibes", "description": "ignored"},
            {"type": "Emotion", "description": "Admits a mistake"}
        ]});
        let provider = Arc::new(ScriptedProvider::new(vec![
            json_response(reply.clone()),
            json_response(reply),
        ]));
        let store = seeded().await;
        let analyzer = analyzer(provider, store.clone());

        let patterns = analyzer.analyze("u1").await.unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].source_ids, vec!["t1"]);
        assert_eq!(patterns[1].kind, PatternType::Emotion);

        PatternLearner::new(store.clone(), 0.5).reinforce(&patterns[0].id).await.unwrap();
        analyzer.analyze("u1").await.unwrap();

        let all = store.list_patterns("u1", PatternQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        let hook = store.get_pattern(&patterns[0].id).await.unwrap().unwrap();
        assert!((hook.success_rate - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn no_engagement_data_means_no_model_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let store = Arc::new(InMemoryStore::new());
        let patterns = analyzer(provider.clone(), store).analyze("u1").await.unwrap();
        assert!(patterns.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_analysis_yields_nothing() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("no json here")]));
        let patterns = analyzer(provider, seeded().await).analyze("u1").await.unwrap();
        assert!(patterns.is_empty());
    }
}
