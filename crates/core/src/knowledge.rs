//! Semantic knowledge map: the named projects and tools a user writes about.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    Project,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub kind: KnowledgeKind,

    /// Name as the user writes it
    pub canonical_name: String,

    /// A sentence from the corpus that mentions the entry
    pub description: String,

    /// How many corpus texts mention it
    #[serde(default)]
    pub mentions: u32,
}

/// Lowercase keyword → entry, built from a corpus scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMap {
    pub entries: BTreeMap<String, KnowledgeEntry>,
}

impl KnowledgeMap {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Snapshot for KnowledgeMap {
    const KIND: &'static str = "knowledge_map";
}
