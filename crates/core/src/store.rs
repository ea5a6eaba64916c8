//! Collaborator contracts: the persistence and data sources the core reads
//! and writes through.
//!
//! Implementations live in `voiceprint-memory` (in-memory and SQLite). The
//! relational schema, access control and ingestion behind a production
//! deployment belong to those collaborators, not to the core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::corpus::{CorpusQuery, ExemplarText, Pattern, PatternQuery};
use crate::error::StoreError;
use crate::fingerprint::StyleFingerprint;
use crate::knowledge::KnowledgeMap;
use crate::message::{ConversationId, Message, Role};
use crate::user::{UserProfile, UserStatus};

/// Source of exemplar texts.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// List exemplar texts in the requested order.
    ///
    /// `ExemplarOrder::Engagement` only returns texts that carry an
    /// engagement signal, highest first.
    async fn list_exemplars(
        &self,
        user_id: &str,
        query: CorpusQuery,
    ) -> Result<Vec<ExemplarText>, StoreError>;

    /// Total number of texts on file for the user.
    async fn count(&self, user_id: &str) -> Result<usize, StoreError>;
}

/// Engagement patterns and their learned success rates.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn list_patterns(
        &self,
        user_id: &str,
        query: PatternQuery,
    ) -> Result<Vec<Pattern>, StoreError>;

    async fn get_pattern(&self, pattern_id: &str) -> Result<Option<Pattern>, StoreError>;

    async fn upsert_pattern(&self, pattern: Pattern) -> Result<(), StoreError>;

    /// Add `delta` to the success rate (clamped to 0..=1) and count one use.
    async fn bump_success_rate(&self, pattern_id: &str, delta: f64) -> Result<(), StoreError>;
}

/// A value persisted per user with a last-updated timestamp.
pub trait Snapshot: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage discriminator, e.g. `"fingerprint"`.
    const KIND: &'static str;
}

/// A snapshot plus the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub value: T,
    pub updated_at: DateTime<Utc>,
}

/// Keyed get/put/delete by user id.
///
/// Writers may race; the last write wins.
#[async_trait]
pub trait SnapshotStore<T: Snapshot>: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Stamped<T>>, StoreError>;

    async fn put(&self, user_id: &str, snapshot: Stamped<T>) -> Result<(), StoreError>;

    /// Returns whether an entry existed.
    async fn delete(&self, user_id: &str) -> Result<bool, StoreError>;
}

/// Append-only turn log per conversation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, conversation_id: &ConversationId, message: Message)
        -> Result<(), StoreError>;

    /// The most recent `limit` turns whose role is in `roles` (all roles when
    /// empty), oldest first. A `limit` of 0 returns every matching turn.
    async fn recent(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        roles: &[Role],
    ) -> Result<Vec<Message>, StoreError>;

    /// Total turns recorded for the conversation.
    async fn count(&self, conversation_id: &ConversationId) -> Result<usize, StoreError>;
}

/// How a summary record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryKind {
    /// Rolling summary of one batch of turns
    Batch,
    /// Full compaction of all prior summaries and a recent window
    Deep,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Deep => "deep",
        }
    }
}

/// One long-term memory record of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub conversation_id: ConversationId,
    pub kind: SummaryKind,
    pub content: String,
    /// Number of turns (from the start of the conversation) this record accounts for
    pub covers_turns: usize,
    pub token_estimate: usize,
    pub created_at: DateTime<Utc>,
}

/// Long-term conversational memory.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// All records for the conversation, oldest first.
    async fn list(&self, conversation_id: &ConversationId)
        -> Result<Vec<SummaryRecord>, StoreError>;

    async fn append(&self, record: SummaryRecord) -> Result<(), StoreError>;

    /// Atomically replace every record of the conversation with `record`.
    ///
    /// On error the previous records must be left untouched.
    async fn replace_all(
        &self,
        conversation_id: &ConversationId,
        record: SummaryRecord,
    ) -> Result<(), StoreError>;
}

/// Profile and onboarding diagnostics per user.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn status(&self, user_id: &str) -> Result<UserStatus, StoreError>;
}

/// Write side of the corpus, used by ingestion (the CLI `import` command).
///
/// Callers must invalidate cached fingerprints and knowledge maps after a write.
#[async_trait]
pub trait CorpusWriter: Send + Sync {
    /// Insert or replace texts by id. Returns how many were written.
    async fn add_exemplars(&self, texts: Vec<ExemplarText>) -> Result<usize, StoreError>;

    async fn set_profile(&self, profile: UserProfile) -> Result<(), StoreError>;
}

/// Every collaborator a running agent needs, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub corpus: Arc<dyn CorpusSource>,
    pub corpus_writer: Arc<dyn CorpusWriter>,
    pub patterns: Arc<dyn PatternStore>,
    pub fingerprints: Arc<dyn SnapshotStore<StyleFingerprint>>,
    pub knowledge: Arc<dyn SnapshotStore<KnowledgeMap>>,
    pub conversations: Arc<dyn ConversationStore>,
    pub summaries: Arc<dyn SummaryStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl Stores {
    /// Wire every collaborator to one backend that implements them all.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: CorpusSource
            + CorpusWriter
            + PatternStore
            + SnapshotStore<StyleFingerprint>
            + SnapshotStore<KnowledgeMap>
            + ConversationStore
            + SummaryStore
            + UserDirectory
            + 'static,
    {
        Self {
            corpus: backend.clone(),
            corpus_writer: backend.clone(),
            patterns: backend.clone(),
            fingerprints: backend.clone(),
            knowledge: backend.clone(),
            conversations: backend.clone(),
            summaries: backend.clone(),
            users: backend,
        }
    }
}
