//! Per-user profile and data-completeness flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public profile details, as provided by the ingestion collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub about: String,
    /// The topic area the user writes in
    #[serde(default)]
    pub niche: String,
}

/// Aggregate onboarding flags used by the diagnostics tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    pub has_corpus: bool,
    pub has_fingerprint: bool,
    pub has_patterns: bool,
    /// Number of exemplar texts on file
    pub corpus_size: usize,
    /// How many of them carry an engagement signal
    pub analyzed_texts: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint_updated_at: Option<DateTime<Utc>>,
}

impl UserStatus {
    /// True when nothing is missing for generation.
    pub fn is_ready(&self) -> bool {
        self.has_corpus && self.has_fingerprint && self.has_patterns
    }
}
