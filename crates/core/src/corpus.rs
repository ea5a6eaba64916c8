//! Corpus value types: exemplar texts and engagement patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical, user-authored text unit.
///
/// Owned by the ingestion collaborator; the core only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemplarText {
    pub id: String,

    pub user_id: String,

    /// The raw text as published
    pub text: String,

    /// Engagement signal (reactions, comments, ...), if the source reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<f64>,

    /// When the text was published
    pub published_at: DateTime<Utc>,
}

impl ExemplarText {
    /// The opening line, used as the post's hook.
    pub fn hook(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

/// Ordering for corpus lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemplarOrder {
    /// Highest engagement first; texts without a signal are excluded.
    Engagement,
    /// Newest first.
    Recency,
}

/// A corpus lookup. A `limit` of 0 means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusQuery {
    pub order: ExemplarOrder,
    pub limit: usize,
}

impl CorpusQuery {
    pub fn top(limit: usize) -> Self {
        Self { order: ExemplarOrder::Engagement, limit }
    }

    pub fn recent(limit: usize) -> Self {
        Self { order: ExemplarOrder::Recency, limit }
    }
}

/// What kind of engagement driver a pattern describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Hook,
    Format,
    Cta,
    Topic,
    Timing,
    Emotion,
}

impl PatternType {
    pub const ALL: [PatternType; 6] = [
        Self::Hook,
        Self::Format,
        Self::Cta,
        Self::Topic,
        Self::Timing,
        Self::Emotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hook => "hook",
            Self::Format => "format",
            Self::Cta => "cta",
            Self::Topic => "topic",
            Self::Timing => "timing",
            Self::Emotion => "emotion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// A reusable description of what drove engagement in one or more texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,

    pub user_id: String,

    pub kind: PatternType,

    pub description: String,

    /// Exemplar ids this pattern was observed in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<String>,

    /// Share of outputs using this pattern that were well received (0.0–1.0)
    pub success_rate: f64,

    /// How many times the pattern was confirmed
    pub usage_count: u32,

    pub updated_at: DateTime<Utc>,
}

/// A pattern lookup. Empty `types` means every type; a `limit` of 0 means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternQuery {
    pub types: Vec<PatternType>,
    pub limit: usize,
}
