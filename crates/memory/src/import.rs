//! Corpus import from JSON exports.
//!
//! Accepts either a bare array of texts or an object carrying a profile:
//!
//! ```json
//! { "profile": { "display_name": "Dana", "niche": "devtools" },
//!   "texts": [ { "text": "We shipped it anyway.", "engagement": 412 } ] }
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use voiceprint_core::corpus::ExemplarText;
use voiceprint_core::error::StoreError;
use voiceprint_core::store::CorpusWriter;
use voiceprint_core::user::UserProfile;

#[derive(Debug, Deserialize)]
struct ImportedText {
    #[serde(default)]
    id: Option<String>,
    text: String,
    #[serde(default)]
    engagement: Option<f64>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ImportedProfile {
    display_name: String,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    about: String,
    #[serde(default)]
    niche: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Texts(Vec<ImportedText>),
    WithProfile {
        #[serde(default)]
        profile: Option<ImportedProfile>,
        texts: Vec<ImportedText>,
    },
}

/// What an import produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedImport {
    pub texts: Vec<ExemplarText>,
    pub profile: Option<UserProfile>,
}

/// Parse an export for `user_id`. Blank texts are dropped; missing ids are generated.
pub fn parse_import(user_id: &str, json: &str) -> Result<ParsedImport, StoreError> {
    let file: ImportFile = serde_json::from_str(json)
        .map_err(|e| StoreError::Storage(format!("invalid import file: {e}")))?;

    let (texts, profile) = match file {
        ImportFile::Texts(texts) => (texts, None),
        ImportFile::WithProfile { profile, texts } => (texts, profile),
    };

    let now = Utc::now();
    let texts = texts
        .into_iter()
        .filter(|t| !t.text.trim().is_empty())
        .map(|t| ExemplarText {
            id: t.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            user_id: user_id.to_string(),
            text: t.text,
            engagement: t.engagement,
            published_at: t.published_at.unwrap_or(now),
        })
        .collect();

    let profile = profile.map(|p| UserProfile {
        user_id: user_id.to_string(),
        display_name: p.display_name,
        headline: p.headline,
        about: p.about,
        niche: p.niche,
    });

    Ok(ParsedImport { texts, profile })
}

/// Parse and write an export. Returns the number of texts stored.
pub async fn import_exemplars(
    writer: &dyn CorpusWriter,
    user_id: &str,
    json: &str,
) -> Result<usize, StoreError> {
    let parsed = parse_import(user_id, json)?;
    if let Some(profile) = parsed.profile {
        writer.set_profile(profile).await?;
    }
    writer.add_exemplars(parsed.texts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use voiceprint_core::corpus::CorpusQuery;
    use voiceprint_core::store::{CorpusSource, UserDirectory};

    #[test]
    fn bare_array() {
        let parsed = parse_import(
            "u1",
            r#"[{"text": "We shipped it anyway.", "engagement": 12}, {"text": "   "}]"#,
        )
        .unwrap();
        assert_eq!(parsed.texts.len(), 1);
        assert_eq!(parsed.texts[0].user_id, "u1");
        assert_eq!(parsed.texts[0].engagement, Some(12.0));
        assert!(parsed.profile.is_none());
    }

    #[test]
    fn object_with_profile() {
        let parsed = parse_import(
            "u1",
            r#"{"profile": {"display_name": "Dana", "niche": "devtools"},
                "texts": [{"id": "t1", "text": "Hook line", "published_at": "2025-03-01T09:00:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.texts[0].id, "t1");
        assert_eq!(parsed.profile.unwrap().niche, "devtools");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_import("u1", "{\"nope\": 1}").is_err());
    }

    #[tokio::test]
    async fn import_writes_texts_and_profile() {
        let store = InMemoryStore::new();
        let n = import_exemplars(
            &store,
            "u1",
            r#"{"profile": {"display_name": "Dana"}, "texts": [{"text": "a"}, {"text": "b"}]}"#,
        )
        .await
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.list_exemplars("u1", CorpusQuery::recent(10)).await.unwrap().len(), 2);
        assert_eq!(store.profile("u1").await.unwrap().unwrap().display_name, "Dana");
    }
}
