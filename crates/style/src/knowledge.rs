//! Knowledge map: which projects and tools the user writes about.
//!
//! Built by a heuristic scan of the corpus, cached like the fingerprint, and
//! used to resolve references such as "my startup" or "that tool I use".

use async_trait::async_trait;
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::info;
use voiceprint_config::LexiconConfig;
use voiceprint_core::corpus::{CorpusQuery, ExemplarText};
use voiceprint_core::error::{Result, VoiceError};
use voiceprint_core::knowledge::{KnowledgeEntry, KnowledgeKind, KnowledgeMap};
use voiceprint_core::store::CorpusSource;

use crate::cache::{Built, SnapshotSource};
use crate::text;

/// A capitalised name of up to three words after a "building X" style verb.
static PROJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?i:building|built|launched|launching|working on|shipped|founded|started|my startup|our product|side project)\s+([A-Z][A-Za-z0-9]*(?:[ -][A-Z][A-Za-z0-9]*){0,2})",
    )
    .unwrap()
});

/// Capitalised words that start sentences, not names.
const NOT_A_NAME: &[&str] = &[
    "I", "A", "An", "The", "It", "This", "That", "We", "My", "Our", "Last", "Next", "In", "On",
    "At", "And", "But", "So",
];

const MAX_DESCRIPTION: usize = 200;

/// Case-sensitive whole-word match, for names like "Go" that are also common words.
fn contains_name(haystack: &str, name: &str) -> bool {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(name).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn describe(texts: &[ExemplarText], name: &str, exact: bool) -> String {
    texts
        .iter()
        .flat_map(|t| text::sentences(&t.text))
        .find(|s| if exact { contains_name(s, name) } else { text::contains_word(s, name) })
        .map(|s| text::preview(s, MAX_DESCRIPTION))
        .unwrap_or_default()
}

pub struct KnowledgeMapBuilder {
    corpus: Arc<dyn CorpusSource>,
    known_tools: Vec<String>,
}

impl KnowledgeMapBuilder {
    pub fn new(corpus: Arc<dyn CorpusSource>, lexicon: &LexiconConfig) -> Self {
        Self { corpus, known_tools: lexicon.known_tools.clone() }
    }

    /// Scan texts (newest first) for projects and known tools.
    pub fn scan(&self, texts: &[ExemplarText]) -> KnowledgeMap {
        let mut entries = BTreeMap::new();

        for tool in &self.known_tools {
            let mentions = texts.iter().filter(|t| contains_name(&t.text, tool)).count();
            if mentions > 0 {
                entries.insert(
                    tool.to_lowercase(),
                    KnowledgeEntry {
                        kind: KnowledgeKind::Tool,
                        canonical_name: tool.clone(),
                        description: describe(texts, tool, true),
                        mentions: mentions as u32,
                    },
                );
            }
        }

        for t in texts {
            for caps in PROJECT.captures_iter(&t.text) {
                let Some(name) = caps.get(1).map(|m| m.as_str().trim()) else {
                    continue;
                };
                let key = name.to_lowercase();
                if NOT_A_NAME.contains(&name) || entries.contains_key(&key) {
                    continue;
                }
                let mentions = texts.iter().filter(|x| text::contains_word(&x.text, name)).count();
                entries.insert(
                    key,
                    KnowledgeEntry {
                        kind: KnowledgeKind::Project,
                        canonical_name: name.to_string(),
                        description: describe(texts, name, false),
                        mentions: mentions as u32,
                    },
                );
            }
        }

        KnowledgeMap { entries }
    }
}

#[async_trait]
impl SnapshotSource<KnowledgeMap> for KnowledgeMapBuilder {
    async fn build(&self, user_id: &str) -> Result<Built<KnowledgeMap>> {
        let texts = self.corpus.list_exemplars(user_id, CorpusQuery::recent(0)).await?;
        if texts.is_empty() {
            return Err(VoiceError::NoCorpus { user_id: user_id.to_string() }.into());
        }
        let map = self.scan(&texts);
        info!(user_id, texts = texts.len(), entries = map.len(), "Knowledge map built");
        Ok(Built::durable(map))
    }
}

/// Entries the query refers to, most mentioned first.
///
/// An entry matches when its keyword appears as a word in the query, or the
/// query appears as a word in the entry's name or description.
pub fn resolve<'a>(map: &'a KnowledgeMap, query: &str) -> Vec<&'a KnowledgeEntry> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let wants_tool = text::contains_word(query, "tool") || text::contains_word(query, "tools");
    let wants_project = ["startup", "project", "product", "company", "app"]
        .iter()
        .any(|w| text::contains_word(query, w));

    let mut hits: Vec<&KnowledgeEntry> = map
        .entries
        .iter()
        .filter(|(keyword, entry)| {
            text::contains_word(query, keyword)
                || text::contains_word(&entry.canonical_name, query)
                || text::contains_word(&entry.description, query)
        })
        .map(|(_, entry)| entry)
        .collect();

    // "my startup" names no entry directly; fall back to the kind it asks for.
    if hits.is_empty() && (wants_tool || wants_project) {
        hits = map
            .entries
            .values()
            .filter(|e| match e.kind {
                KnowledgeKind::Tool => wants_tool,
                KnowledgeKind::Project => wants_project,
            })
            .collect();
    }

    hits.sort_by(|a, b| {
        b.mentions
            .cmp(&a.mentions)
            .then_with(|| a.canonical_name.cmp(&b.canonical_name))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use voiceprint_core::error::Error;
    use voiceprint_memory::InMemoryStore;

    fn exemplar(id: &str, text: &str) -> ExemplarText {
        ExemplarText {
            id: id.into(),
            user_id: "u1".into(),
            text: text.into(),
            engagement: None,
            published_at: Utc::now(),
        }
    }

    fn builder() -> KnowledgeMapBuilder {
        KnowledgeMapBuilder::new(Arc::new(InMemoryStore::new()), &LexiconConfig::default())
    }

    fn corpus() -> Vec<ExemplarText> {
        vec![
            exemplar("1", "Spent the weekend building Trailhead. We run everything in Notion."),
            exemplar("2", "Trailhead hit 100 users. Notion still holds it together."),
            exemplar("3", "Let's go. We launched It yesterday."),
        ]
    }

    #[test]
    fn scan_finds_projects_and_tools() {
        let map = builder().scan(&corpus());

        let trailhead = &map.entries["trailhead"];
        assert_eq!(trailhead.kind, KnowledgeKind::Project);
        assert_eq!(trailhead.mentions, 2);
        assert_eq!(trailhead.description, "Spent the weekend building Trailhead");

        let notion = &map.entries["notion"];
        assert_eq!(notion.kind, KnowledgeKind::Tool);
        assert_eq!(notion.mentions, 2);

        // "go" is lowercase here, and "It" is not a name
        assert!(!map.entries.contains_key("go"));
        assert!(!map.entries.contains_key("it"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn resolve_by_name_and_by_kind() {
        let map = builder().scan(&corpus());

        let hits = resolve(&map, "write about trailhead");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].canonical_name, "Trailhead");

        let hits = resolve(&map, "my startup");
        assert_eq!(hits[0].canonical_name, "Trailhead");

        let hits = resolve(&map, "that tool I use");
        assert_eq!(hits[0].canonical_name, "Notion");

        assert!(resolve(&map, "kubernetes").is_empty());
        assert!(resolve(&map, "  ").is_empty());
    }

    #[tokio::test]
    async fn build_requires_a_corpus() {
        let err = builder().build("u1").await.unwrap_err();
        assert!(matches!(err, Error::Voice(VoiceError::NoCorpus { .. })));
    }
}
