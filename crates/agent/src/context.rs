//! Conversation memory: rolling batch summaries and deep compaction.
//!
//! Runs off the request path. Every write is a single append or a single
//! `replace_all`, issued only after the summary text is in hand, so a failed
//! model call leaves the earlier memory exactly as it was.

use chrono::Utc;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;
use voiceprint_core::error::Result;
use voiceprint_core::event::{DomainEvent, EventBus};
use voiceprint_core::message::{ConversationId, Message, Role};
use voiceprint_core::provider::{Provider, ProviderRequest};
use voiceprint_core::store::{ConversationStore, SummaryKind, SummaryRecord, SummaryStore};

use crate::prompts;
use crate::token::TokenBudget;

const SUMMARY_TEMPERATURE: f32 = 0.2;

/// What a maintenance pass did.
#[derive(Debug, Clone, PartialEq)]
pub enum Maintenance {
    Skipped,
    Summarized(SummaryRecord),
    /// Deep compaction ran but would not have shrunk memory, so nothing was written
    NotSmaller { before: usize, after: usize },
}

pub struct ContextManager {
    provider: Arc<dyn Provider>,
    model: String,
    conversations: Arc<dyn ConversationStore>,
    summaries: Arc<dyn SummaryStore>,
    budget: TokenBudget,
    deep_window: usize,
    events: Option<Arc<EventBus>>,
}

impl ContextManager {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        conversations: Arc<dyn ConversationStore>,
        summaries: Arc<dyn SummaryStore>,
        budget: TokenBudget,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            conversations,
            summaries,
            budget,
            deep_window: 20,
            events: None,
        }
    }

    pub fn with_deep_window(mut self, turns: usize) -> Self {
        self.deep_window = turns.max(1);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    /// The conversation's long-term memory, oldest first.
    pub async fn memory(&self, conversation_id: &ConversationId) -> Result<Vec<SummaryRecord>> {
        Ok(self.summaries.list(conversation_id).await?)
    }

    /// Tokens the model would see for this conversation's memory: every
    /// summary plus the turns no summary covers yet.
    pub async fn footprint(&self, conversation_id: &ConversationId) -> Result<usize> {
        let records = self.summaries.list(conversation_id).await?;
        let turns = self.conversations.recent(conversation_id, 0, &[]).await?;
        let covered = covered_turns(&records).min(turns.len());
        Ok(self.budget.estimate_summaries(&records)
            + self.budget.estimate_messages(&turns[covered..]))
    }

    /// Deep-compact near the ceiling, otherwise batch-summarize on every
    /// `batch_size`-th user turn.
    pub async fn maintain(&self, conversation_id: &ConversationId) -> Result<Maintenance> {
        let tokens = self.footprint(conversation_id).await?;
        if self.budget.should_deep_summarize(tokens) {
            return self.run(conversation_id, SummaryKind::Deep).await;
        }

        let user_turns = self
            .conversations
            .recent(conversation_id, 0, &[Role::User])
            .await?
            .len();
        if self.budget.should_batch_summarize(user_turns) {
            return self.run(conversation_id, SummaryKind::Batch).await;
        }

        debug!(%conversation_id, tokens, user_turns, "No summarization due");
        Ok(Maintenance::Skipped)
    }

    /// Run `maintain` as a background task on `tracker`. Failures are logged
    /// and published, never returned.
    pub fn spawn_maintenance(self: &Arc<Self>, conversation_id: ConversationId, tracker: &TaskTracker) {
        let manager = Arc::clone(self);
        tracker.spawn(async move {
            if let Err(e) = manager.maintain(&conversation_id).await {
                warn!(%conversation_id, error = %e, "Background summarization failed");
            }
        });
    }

    pub async fn summarize(
        &self,
        conversation_id: &ConversationId,
        kind: SummaryKind,
    ) -> Result<Maintenance> {
        self.run(conversation_id, kind).await
    }

    async fn run(&self, conversation_id: &ConversationId, kind: SummaryKind) -> Result<Maintenance> {
        let outcome = match kind {
            SummaryKind::Batch => self.batch(conversation_id).await,
            SummaryKind::Deep => self.deep(conversation_id).await,
        };
        if let Err(e) = &outcome {
            self.publish(DomainEvent::SummarizationFailed {
                conversation_id: conversation_id.to_string(),
                kind: kind.as_str().to_string(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        outcome
    }

    async fn batch(&self, conversation_id: &ConversationId) -> Result<Maintenance> {
        let records = self.summaries.list(conversation_id).await?;
        let turns = self.conversations.recent(conversation_id, 0, &[]).await?;
        let covered = covered_turns(&records).min(turns.len());
        let slice = &turns[covered..];
        if slice.is_empty() {
            return Ok(Maintenance::Skipped);
        }

        let before = self.budget.estimate_messages(slice);
        let content = self
            .complete(prompts::BATCH_SUMMARY_SYSTEM, prompts::transcript(slice))
            .await?;
        let record = self.record(conversation_id, SummaryKind::Batch, content, turns.len());

        self.summaries.append(record.clone()).await?;
        self.completed(&record, before);
        Ok(Maintenance::Summarized(record))
    }

    async fn deep(&self, conversation_id: &ConversationId) -> Result<Maintenance> {
        let records = self.summaries.list(conversation_id).await?;
        let turns = self.conversations.recent(conversation_id, 0, &[]).await?;
        let covered = covered_turns(&records).min(turns.len());
        let before = self.budget.estimate_summaries(&records)
            + self.budget.estimate_messages(&turns[covered..]);

        let window_start = turns.len().saturating_sub(self.deep_window);
        let content = self
            .complete(
                prompts::DEEP_SUMMARY_SYSTEM,
                prompts::deep_input(&records, &turns[window_start..]),
            )
            .await?;
        let record = self.record(conversation_id, SummaryKind::Deep, content, turns.len());

        if record.token_estimate >= before {
            warn!(
                %conversation_id,
                before,
                after = record.token_estimate,
                "Deep summary is not smaller than memory, keeping the existing records"
            );
            return Ok(Maintenance::NotSmaller { before, after: record.token_estimate });
        }

        self.summaries.replace_all(conversation_id, record.clone()).await?;
        self.completed(&record, before);
        Ok(Maintenance::Summarized(record))
    }

    async fn complete(&self, system: &str, input: String) -> Result<String> {
        let request = ProviderRequest::new(
            &self.model,
            vec![Message::system(system), Message::user(input)],
        )
        .with_temperature(SUMMARY_TEMPERATURE);
        let response = self.provider.complete(request).await?;
        Ok(response.message.content.trim().to_string())
    }

    fn record(
        &self,
        conversation_id: &ConversationId,
        kind: SummaryKind,
        content: String,
        covers_turns: usize,
    ) -> SummaryRecord {
        SummaryRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.clone(),
            kind,
            token_estimate: self.budget.estimate_tokens(&content),
            content,
            covers_turns,
            created_at: Utc::now(),
        }
    }

    fn completed(&self, record: &SummaryRecord, tokens_before: usize) {
        info!(
            conversation_id = %record.conversation_id,
            kind = record.kind.as_str(),
            covers_turns = record.covers_turns,
            tokens_before,
            tokens_after = record.token_estimate,
            "Summarization committed"
        );
        self.publish(DomainEvent::SummarizationCompleted {
            conversation_id: record.conversation_id.to_string(),
            kind: record.kind.as_str().to_string(),
            tokens_before,
            tokens_after: record.token_estimate,
            timestamp: Utc::now(),
        });
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

fn covered_turns(records: &[SummaryRecord]) -> usize {
    records.iter().map(|r| r.covers_turns).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceprint_core::error::{Error, ProviderError};
    use voiceprint_core::testing::{ScriptedProvider, text_response};
    use voiceprint_memory::InMemoryStore;

    fn conv() -> ConversationId {
        ConversationId::from("c1")
    }

    async fn exchange(store: &InMemoryStore, i: usize) {
        ConversationStore::append(store, &conv(), Message::user(format!("request {i}")))
            .await
            .unwrap();
        ConversationStore::append(store, &conv(), Message::assistant(format!("reply {i}")))
            .await
            .unwrap();
    }

    async fn store_with_exchanges(n: usize) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..n {
            exchange(&store, i).await;
        }
        store
    }

    fn manager(store: Arc<InMemoryStore>, provider: Arc<ScriptedProvider>, budget: TokenBudget) -> ContextManager {
        ContextManager::new(provider, "m", store.clone(), store, budget)
    }

    #[tokio::test]
    async fn nothing_due_before_the_tenth_exchange() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let manager = manager(store_with_exchanges(9).await, provider.clone(), TokenBudget::default());
        assert_eq!(manager.maintain(&conv()).await.unwrap(), Maintenance::Skipped);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn batch_covers_only_unsummarized_turns() {
        let store = store_with_exchanges(10).await;
        let provider = Arc::new(ScriptedProvider::texts(&["first ten", "next ten"]));
        let manager = manager(store.clone(), provider.clone(), TokenBudget::default());

        let Maintenance::Summarized(first) = manager.maintain(&conv()).await.unwrap() else {
            panic!("expected a batch summary");
        };
        assert_eq!(first.kind, SummaryKind::Batch);
        assert_eq!(first.covers_turns, 20);

        for i in 10..20 {
            exchange(&store, i).await;
        }
        manager.maintain(&conv()).await.unwrap();

        let second_input = &provider.requests()[1].messages[1].content;
        assert!(second_input.contains("request 10"));
        assert!(!second_input.contains("request 9\n"));
        assert!(provider.requests()[1].messages[0].content.starts_with("# CONVERSATION SUMMARY"));

        let records = manager.memory(&conv()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].covers_turns, 40);
    }

    #[tokio::test]
    async fn deep_compaction_replaces_everything_when_smaller() {
        let store = store_with_exchanges(3).await;
        let budget = TokenBudget { deep_threshold: 10, ..TokenBudget::default() };
        let provider = Arc::new(ScriptedProvider::texts(&["short"]));
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let manager = manager(store.clone(), provider.clone(), budget).with_events(events);

        for content in ["a long batch summary of earlier talk", "another long batch summary"] {
            let record = manager.record(&conv(), SummaryKind::Batch, content.into(), 2);
            SummaryStore::append(store.as_ref(), record).await.unwrap();
        }
        let before = manager.footprint(&conv()).await.unwrap();

        let Maintenance::Summarized(record) = manager.maintain(&conv()).await.unwrap() else {
            panic!("expected deep compaction");
        };
        assert_eq!(record.kind, SummaryKind::Deep);
        assert_eq!(record.covers_turns, 6);
        assert!(provider.requests()[0].messages[0].content.starts_with("# MEMORY COMPACTION"));

        let records = manager.memory(&conv()).await.unwrap();
        assert_eq!(records, vec![record]);
        assert!(manager.footprint(&conv()).await.unwrap() < before);

        let event = rx.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::SummarizationCompleted { kind, .. } if kind == "deep"));
    }

    #[tokio::test]
    async fn deep_compaction_never_grows_memory() {
        let store = store_with_exchanges(1).await;
        let budget = TokenBudget { deep_threshold: 1, ..TokenBudget::default() };
        let bloated = "word ".repeat(200);
        let provider = Arc::new(ScriptedProvider::texts(&[&bloated]));
        let manager = manager(store.clone(), provider, budget);

        let outcome = manager.maintain(&conv()).await.unwrap();
        assert!(matches!(outcome, Maintenance::NotSmaller { .. }));
        assert!(manager.memory(&conv()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_summary_leaves_memory_intact() {
        let store = store_with_exchanges(10).await;
        let existing = SummaryRecord {
            id: "old".into(),
            conversation_id: conv(),
            kind: SummaryKind::Batch,
            content: "earlier".into(),
            covers_turns: 4,
            token_estimate: 2,
            created_at: Utc::now(),
        };
        SummaryStore::append(store.as_ref(), existing.clone()).await.unwrap();

        let provider = Arc::new(ScriptedProvider::with_results(vec![Err(ProviderError::Timeout(
            "120s".into(),
        ))]));
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let manager = manager(store.clone(), provider, TokenBudget::default()).with_events(events);

        let err = manager.maintain(&conv()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(_))));
        assert_eq!(manager.memory(&conv()).await.unwrap(), vec![existing]);

        let event = rx.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::SummarizationFailed { kind, .. } if kind == "batch"));
    }

    #[tokio::test]
    async fn background_maintenance_can_be_awaited() {
        let store = store_with_exchanges(10).await;
        let provider = Arc::new(ScriptedProvider::texts(&["summary"]));
        let manager = Arc::new(manager(store, provider, TokenBudget::default()));

        let tracker = TaskTracker::new();
        manager.spawn_maintenance(conv(), &tracker);
        tracker.close();
        tracker.wait().await;

        assert_eq!(manager.memory(&conv()).await.unwrap().len(), 1);
    }
}
