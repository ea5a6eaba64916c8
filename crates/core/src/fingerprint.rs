//! Style fingerprint ("voice DNA"): the structured style profile of a user.

use serde::{Deserialize, Serialize};

use crate::store::Snapshot;

/// A structured style profile derived from a user's exemplar texts.
///
/// Every list is quoted from the corpus, not paraphrased advice. A fingerprint
/// missing hooks, signature phrases or forbidden phrases must not drive
/// generation; see [`StyleFingerprint::is_complete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleFingerprint {
    /// Opening-line patterns, best first
    #[serde(default)]
    pub hook_patterns: Vec<String>,

    /// Verbatim first sentences from top texts
    #[serde(default)]
    pub first_sentences: Vec<String>,

    /// Phrases the user keeps coming back to (must appear)
    #[serde(default)]
    pub signature_phrases: Vec<String>,

    /// Phrases and words the user never uses (must not appear)
    #[serde(default)]
    pub forbidden_phrases: Vec<String>,

    /// Mean sentence length in words
    #[serde(default)]
    pub avg_sentence_length: f32,

    #[serde(default)]
    pub uses_contractions: bool,

    #[serde(default)]
    pub uses_fragments: bool,

    #[serde(default)]
    pub uses_emoji: bool,

    #[serde(default)]
    pub uses_hashtags: bool,

    #[serde(default)]
    pub uses_bullet_lists: bool,

    /// The glyph that starts the user's list items
    #[serde(default = "default_bullet_glyph")]
    pub bullet_glyph: String,

    /// How a typical post moves from hook to close
    #[serde(default)]
    pub narrative_steps: Vec<String>,

    #[serde(default)]
    pub closing_style: String,
}

fn default_bullet_glyph() -> String {
    "-".into()
}

impl StyleFingerprint {
    /// Names of the required fields that are empty.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.hook_patterns.is_empty() {
            missing.push("hook_patterns".to_string());
        }
        if self.signature_phrases.is_empty() {
            missing.push("signature_phrases".to_string());
        }
        if self.forbidden_phrases.is_empty() {
            missing.push("forbidden_phrases".to_string());
        }
        missing
    }

    /// The character list items start with. Falls back to `-` unless the
    /// stored glyph is a single non-alphanumeric character.
    pub fn list_marker(&self) -> char {
        let mut chars = self.bullet_glyph.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_alphanumeric() => c,
            _ => '-',
        }
    }

    /// True iff hooks, signature phrases and forbidden phrases are all non-empty.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

impl Default for StyleFingerprint {
    fn default() -> Self {
        Self {
            hook_patterns: Vec::new(),
            first_sentences: Vec::new(),
            signature_phrases: Vec::new(),
            forbidden_phrases: Vec::new(),
            avg_sentence_length: 0.0,
            uses_contractions: false,
            uses_fragments: false,
            uses_emoji: false,
            uses_hashtags: false,
            uses_bullet_lists: false,
            bullet_glyph: default_bullet_glyph(),
            narrative_steps: Vec::new(),
            closing_style: String::new(),
        }
    }
}

impl Snapshot for StyleFingerprint {
    const KIND: &'static str = "fingerprint";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> StyleFingerprint {
        StyleFingerprint {
            hook_patterns: vec!["Confession opener".into()],
            signature_phrases: vec!["shipped it anyway".into()],
            forbidden_phrases: vec!["robust solution".into()],
            ..StyleFingerprint::default()
        }
    }

    #[test]
    fn complete_when_all_required_lists_present() {
        assert!(complete().is_complete());
    }

    #[test]
    fn each_required_list_is_checked() {
        let mut fp = complete();
        fp.hook_patterns.clear();
        assert_eq!(fp.missing_fields(), vec!["hook_patterns"]);

        let mut fp = complete();
        fp.signature_phrases.clear();
        assert!(!fp.is_complete());

        let mut fp = complete();
        fp.forbidden_phrases.clear();
        assert_eq!(fp.missing_fields(), vec!["forbidden_phrases"]);
    }

    #[test]
    fn optional_fields_do_not_affect_completeness() {
        let fp = StyleFingerprint {
            first_sentences: vec![],
            narrative_steps: vec![],
            closing_style: String::new(),
            ..complete()
        };
        assert!(fp.is_complete());
    }

    #[test]
    fn list_marker_falls_back_to_hyphen() {
        let with = |glyph: &str| StyleFingerprint { bullet_glyph: glyph.into(), ..complete() };
        assert_eq!(with(" \u{2022} ").list_marker(), '\u{2022}');
        assert_eq!(with("*").list_marker(), '*');
        assert_eq!(with("").list_marker(), '-');
        assert_eq!(with("none").list_marker(), '-');
        assert_eq!(with("1").list_marker(), '-');
    }

    #[test]
    fn lenient_deserialization_fills_defaults() {
        let fp: StyleFingerprint =
            serde_json::from_str(r#"{"hook_patterns":["Question"]}"#).unwrap();
        assert_eq!(fp.bullet_glyph, "-");
        assert_eq!(fp.missing_fields(), vec!["signature_phrases", "forbidden_phrases"]);
    }
}
