//! # Voiceprint Core
//!
//! Domain types, collaborator traits, and error definitions for the Voiceprint
//! writing agent. This crate has **no framework dependencies**; it defines the
//! model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator (language model, corpus source, stores, diagnostics) is
//! a trait here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted providers and in-memory stores
//! - Clean dependency graph (all crates depend inward on core)

pub mod clock;
pub mod corpus;
pub mod error;
pub mod event;
pub mod fingerprint;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;
pub mod user;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use corpus::{CorpusQuery, ExemplarOrder, ExemplarText, Pattern, PatternQuery, PatternType};
pub use error::{Error, ProviderError, Result, StoreError, ToolError, VoiceError};
pub use event::{DomainEvent, EventBus};
pub use fingerprint::StyleFingerprint;
pub use knowledge::{KnowledgeEntry, KnowledgeKind, KnowledgeMap};
pub use message::{ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use store::{
    ConversationStore, CorpusSource, CorpusWriter, PatternStore, Snapshot, SnapshotStore,
    Stamped, Stores, SummaryKind, SummaryRecord, SummaryStore, UserDirectory,
};
pub use tool::{Diagnostic, Tool, ToolCall, ToolContext, ToolName, ToolRegistry, ToolResult};
pub use user::{UserProfile, UserStatus};
