//! # Voiceprint Style
//!
//! Everything that turns a user's past writing into new writing in the same
//! voice:
//!
//! - [`extractor`] derives a [`StyleFingerprint`](voiceprint_core::StyleFingerprint)
//!   from the user's best texts.
//! - [`cache`] keeps fingerprints and knowledge maps in the snapshot store
//!   with a TTL.
//! - [`pipeline`] prompts, drafts, post-processes ([`humanize`]) and scores
//!   ([`validator`]) a text, regenerating once when it falls short.
//! - [`knowledge`] maps the projects and tools the user writes about.
//! - [`patterns`] discovers engagement patterns and learns their success rates.

pub mod cache;
pub mod extractor;
pub mod humanize;
pub mod knowledge;
pub mod patterns;
pub mod pipeline;
pub mod prompts;
pub mod text;
pub mod validator;

pub use cache::{Built, FingerprintCache, KnowledgeCache, SnapshotCache, SnapshotSource};
pub use extractor::{FingerprintExtractor, emergency_fingerprint, select_exemplars};
pub use humanize::Humanizer;
pub use knowledge::{KnowledgeMapBuilder, resolve};
pub use patterns::{PatternAnalyzer, PatternLearner};
pub use pipeline::{GeneratedContent, GenerationPipeline, GenerationRequest};
pub use validator::{ValidationContext, Validator, Verdict};
