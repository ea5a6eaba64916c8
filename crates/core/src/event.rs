//! Domain event system: the feed consumed by the observability collaborator.
//!
//! Events are published when something interesting happens in the system.
//! Nothing in the core reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A tool was executed by the orchestration loop
    ToolExecuted {
        conversation_id: String,
        tool_name: String,
        /// Arguments, truncated for logging
        arguments_preview: String,
        success: bool,
        /// Diagnostic reason when the tool failed
        reason: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The orchestration loop returned to the caller
    LoopFinished {
        conversation_id: String,
        iterations: u32,
        exhausted: bool,
        timestamp: DateTime<Utc>,
    },

    /// A fingerprint was extracted (or the emergency default was substituted)
    FingerprintExtracted {
        user_id: String,
        exemplars_used: usize,
        fallback: bool,
        timestamp: DateTime<Utc>,
    },

    /// The generation pipeline accepted a text
    ContentGenerated {
        user_id: String,
        score: u8,
        regenerated: bool,
        timestamp: DateTime<Utc>,
    },

    /// The generation pipeline refused to return a text
    ContentRejected {
        user_id: String,
        score: u8,
        issues: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A background summarization committed
    SummarizationCompleted {
        conversation_id: String,
        kind: String,
        tokens_before: usize,
        tokens_after: usize,
        timestamp: DateTime<Utc>,
    },

    /// A background summarization failed; prior memory is intact
    SummarizationFailed {
        conversation_id: String,
        kind: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
