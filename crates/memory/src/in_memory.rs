//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use voiceprint_core::corpus::{CorpusQuery, ExemplarOrder, ExemplarText, Pattern, PatternQuery};
use voiceprint_core::error::StoreError;
use voiceprint_core::fingerprint::StyleFingerprint;
use voiceprint_core::message::{ConversationId, Message, Role};
use voiceprint_core::store::*;
use voiceprint_core::user::{UserProfile, UserStatus};

type SnapshotKey = (&'static str, String);

/// One struct implementing every collaborator trait over locked maps.
///
/// Snapshots are kept as JSON so every `Snapshot` type shares one table,
/// the same way the SQLite backend stores them.
#[derive(Default)]
pub struct InMemoryStore {
    exemplars: RwLock<HashMap<String, Vec<ExemplarText>>>,
    patterns: RwLock<HashMap<String, Pattern>>,
    snapshots: RwLock<HashMap<SnapshotKey, (serde_json::Value, DateTime<Utc>)>>,
    turns: RwLock<HashMap<ConversationId, Vec<Message>>>,
    summaries: RwLock<HashMap<ConversationId, Vec<SummaryRecord>>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one exemplar text.
    pub async fn add_exemplar(&self, text: ExemplarText) {
        let mut exemplars = self.exemplars.write().await;
        let list = exemplars.entry(text.user_id.clone()).or_default();
        list.retain(|e| e.id != text.id);
        list.push(text);
    }
}

fn apply_limit<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    if limit > 0 {
        items.truncate(limit);
    }
    items
}

#[async_trait]
impl CorpusSource for InMemoryStore {
    async fn list_exemplars(
        &self,
        user_id: &str,
        query: CorpusQuery,
    ) -> Result<Vec<ExemplarText>, StoreError> {
        let exemplars = self.exemplars.read().await;
        let mut texts: Vec<ExemplarText> = exemplars.get(user_id).cloned().unwrap_or_default();

        match query.order {
            ExemplarOrder::Engagement => {
                texts.retain(|t| t.engagement.is_some());
                texts.sort_by(|a, b| {
                    b.engagement
                        .partial_cmp(&a.engagement)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            ExemplarOrder::Recency => texts.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        }

        Ok(apply_limit(texts, query.limit))
    }

    async fn count(&self, user_id: &str) -> Result<usize, StoreError> {
        Ok(self.exemplars.read().await.get(user_id).map_or(0, Vec::len))
    }
}

#[async_trait]
impl CorpusWriter for InMemoryStore {
    async fn add_exemplars(&self, texts: Vec<ExemplarText>) -> Result<usize, StoreError> {
        let n = texts.len();
        for text in texts {
            self.add_exemplar(text).await;
        }
        Ok(n)
    }

    async fn set_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
        Ok(())
    }
}

#[async_trait]
impl PatternStore for InMemoryStore {
    async fn list_patterns(
        &self,
        user_id: &str,
        query: PatternQuery,
    ) -> Result<Vec<Pattern>, StoreError> {
        let patterns = self.patterns.read().await;
        let mut found: Vec<Pattern> = patterns
            .values()
            .filter(|p| p.user_id == user_id)
            .filter(|p| query.types.is_empty() || query.types.contains(&p.kind))
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.usage_count.cmp(&a.usage_count))
        });

        Ok(apply_limit(found, query.limit))
    }

    async fn get_pattern(&self, pattern_id: &str) -> Result<Option<Pattern>, StoreError> {
        Ok(self.patterns.read().await.get(pattern_id).cloned())
    }

    async fn upsert_pattern(&self, pattern: Pattern) -> Result<(), StoreError> {
        self.patterns
            .write()
            .await
            .insert(pattern.id.clone(), pattern);
        Ok(())
    }

    async fn bump_success_rate(&self, pattern_id: &str, delta: f64) -> Result<(), StoreError> {
        let mut patterns = self.patterns.write().await;
        let pattern = patterns
            .get_mut(pattern_id)
            .ok_or_else(|| StoreError::NotFound(format!("pattern {pattern_id}")))?;
        pattern.success_rate = (pattern.success_rate + delta).clamp(0.0, 1.0);
        pattern.usage_count += 1;
        pattern.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl<T: Snapshot> SnapshotStore<T> for InMemoryStore {
    async fn get(&self, user_id: &str) -> Result<Option<Stamped<T>>, StoreError> {
        let snapshots = self.snapshots.read().await;
        let Some((body, updated_at)) = snapshots.get(&(T::KIND, user_id.to_string())) else {
            return Ok(None);
        };
        let value = serde_json::from_value(body.clone())
            .map_err(|e| StoreError::QueryFailed(format!("{} body: {e}", T::KIND)))?;
        Ok(Some(Stamped {
            value,
            updated_at: *updated_at,
        }))
    }

    async fn put(&self, user_id: &str, snapshot: Stamped<T>) -> Result<(), StoreError> {
        let body = serde_json::to_value(&snapshot.value)
            .map_err(|e| StoreError::Storage(format!("{} serialization: {e}", T::KIND)))?;
        self.snapshots
            .write()
            .await
            .insert((T::KIND, user_id.to_string()), (body, snapshot.updated_at));
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .snapshots
            .write()
            .await
            .remove(&(T::KIND, user_id.to_string()))
            .is_some())
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<(), StoreError> {
        self.turns
            .write()
            .await
            .entry(conversation_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn recent(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        roles: &[Role],
    ) -> Result<Vec<Message>, StoreError> {
        let turns = self.turns.read().await;
        let Some(all) = turns.get(conversation_id) else {
            return Ok(Vec::new());
        };
        let mut picked: Vec<Message> = all
            .iter()
            .rev()
            .filter(|m| roles.is_empty() || roles.contains(&m.role))
            .take(if limit == 0 { usize::MAX } else { limit })
            .cloned()
            .collect();
        picked.reverse();
        Ok(picked)
    }

    async fn count(&self, conversation_id: &ConversationId) -> Result<usize, StoreError> {
        Ok(self
            .turns
            .read()
            .await
            .get(conversation_id)
            .map_or(0, Vec::len))
    }
}

#[async_trait]
impl SummaryStore for InMemoryStore {
    async fn list(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<SummaryRecord>, StoreError> {
        Ok(self
            .summaries
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, record: SummaryRecord) -> Result<(), StoreError> {
        self.summaries
            .write()
            .await
            .entry(record.conversation_id.clone())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn replace_all(
        &self,
        conversation_id: &ConversationId,
        record: SummaryRecord,
    ) -> Result<(), StoreError> {
        self.summaries
            .write()
            .await
            .insert(conversation_id.clone(), vec![record]);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn status(&self, user_id: &str) -> Result<UserStatus, StoreError> {
        let (corpus_size, analyzed_texts) = {
            let exemplars = self.exemplars.read().await;
            let texts = exemplars.get(user_id).map(Vec::as_slice).unwrap_or_default();
            (
                texts.len(),
                texts.iter().filter(|t| t.engagement.is_some()).count(),
            )
        };
        let has_patterns = self
            .patterns
            .read()
            .await
            .values()
            .any(|p| p.user_id == user_id);
        let fingerprint_updated_at = self
            .snapshots
            .read()
            .await
            .get(&(StyleFingerprint::KIND, user_id.to_string()))
            .map(|(_, at)| *at);

        Ok(UserStatus {
            has_corpus: corpus_size > 0,
            has_fingerprint: fingerprint_updated_at.is_some(),
            has_patterns,
            corpus_size,
            analyzed_texts,
            fingerprint_updated_at,
        })
    }
}
