//! Engagement pattern lookup and success reinforcement.

use async_trait::async_trait;
use serde_json::{Value, json};
use voiceprint_core::corpus::{CorpusQuery, PatternQuery, PatternType};
use voiceprint_core::error::ToolError;
use voiceprint_core::tool::{Diagnostic, Tool, ToolContext, ToolName, ToolResult};

use crate::args::{bounded_usize, exemplar_summaries, failed, required_str};
use crate::services::VoiceServices;

const DEFAULT_PATTERNS: usize = 5;
const MAX_PATTERNS: usize = 20;

fn pattern_types(args: &Value) -> Result<Vec<PatternType>, ToolError> {
    let Some(raw) = args.get("types") else {
        return Ok(Vec::new());
    };
    let items = raw
        .as_array()
        .ok_or_else(|| ToolError::InvalidArguments("'types' must be an array".into()))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| PatternType::parse(&s.trim().to_lowercase()))
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "unknown pattern type {item}, expected one of {}",
                        PatternType::ALL.map(|t| t.as_str()).join(", ")
                    ))
                })
        })
        .collect()
}

pub struct GetEngagementPatternsTool {
    services: VoiceServices,
}

impl GetEngagementPatternsTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for GetEngagementPatternsTool {
    fn name(&self) -> ToolName {
        ToolName::GetEngagementPatterns
    }

    fn description(&self) -> &str {
        "Get what drove engagement in the user's best posts (hooks, formats, calls to \
         action, topics, timing, emotion), best performing first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "types": {
                    "type": "array",
                    "items": { "type": "string", "enum": PatternType::ALL.map(|t| t.as_str()) },
                    "description": "Only these pattern types (default: all)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum patterns to return (default 5, max 20)"
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<ToolResult, ToolError> {
        let query = PatternQuery {
            types: pattern_types(&arguments)?,
            limit: bounded_usize(&arguments, "limit", DEFAULT_PATTERNS, MAX_PATTERNS),
        };
        let stores = &self.services.stores;
        let patterns = stores
            .patterns
            .list_patterns(&ctx.user_id, query)
            .await
            .map_err(|e| failed(self.name(), e))?;

        if patterns.is_empty() {
            let recent = stores
                .corpus
                .list_exemplars(&ctx.user_id, CorpusQuery::recent(3))
                .await
                .map_err(|e| failed(self.name(), e))?;
            return Ok(ToolResult::failure(
                Diagnostic::new("No engagement patterns have been analysed for this user")
                    .suggest(ToolName::ReanalyzeCorpus.as_str())
                    .suggest(ToolName::GetTopExamples.as_str())
                    .with_alternative(json!({ "recent_texts": exemplar_summaries(&recent) })),
            ));
        }

        Ok(ToolResult::success(json!({ "patterns": patterns })))
    }
}

pub struct RecordPatternSuccessTool {
    services: VoiceServices,
}

impl RecordPatternSuccessTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for RecordPatternSuccessTool {
    fn name(&self) -> ToolName {
        ToolName::RecordPatternSuccess
    }

    fn description(&self) -> &str {
        "Record that a post built on an engagement pattern was well received, \
         raising that pattern's success rate."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern_id": { "type": "string", "description": "Id from get_engagement_patterns" }
            },
            "required": ["pattern_id"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<ToolResult, ToolError> {
        let pattern_id = required_str(&arguments, "pattern_id")?;

        let owned = self
            .services
            .stores
            .patterns
            .get_pattern(pattern_id)
            .await
            .map_err(|e| failed(self.name(), e))?
            .is_some_and(|p| p.user_id == ctx.user_id);
        if !owned {
            return Ok(ToolResult::failure(
                Diagnostic::new(format!("No pattern with id '{pattern_id}' for this user"))
                    .suggest(ToolName::GetEngagementPatterns.as_str()),
            ));
        }

        let pattern = self
            .services
            .learner
            .reinforce(pattern_id)
            .await
            .map_err(|e| failed(self.name(), e))?;
        Ok(ToolResult::success(json!({
            "pattern_id": pattern.id,
            "success_rate": pattern.success_rate,
            "usage_count": pattern.usage_count,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, seeded_store, services};
    use chrono::Utc;
    use std::sync::Arc;
    use voiceprint_core::corpus::Pattern;
    use voiceprint_core::store::PatternStore;
    use voiceprint_core::testing::ScriptedProvider;
    use voiceprint_memory::InMemoryStore;

    fn pattern(id: &str, user: &str, kind: PatternType, rate: f64) -> Pattern {
        Pattern {
            id: id.into(),
            user_id: user.into(),
            kind,
            description: format!("pattern {id}"),
            source_ids: vec![],
            success_rate: rate,
            usage_count: 0,
            updated_at: Utc::now(),
        }
    }

    async fn with_patterns() -> Arc<InMemoryStore> {
        let store = seeded_store(2).await;
        store.upsert_pattern(pattern("p1", "u1", PatternType::Hook, 0.4)).await.unwrap();
        store.upsert_pattern(pattern("p2", "u1", PatternType::Cta, 0.9)).await.unwrap();
        store.upsert_pattern(pattern("p3", "other", PatternType::Hook, 0.5)).await.unwrap();
        store
    }

    fn svc(store: Arc<InMemoryStore>) -> VoiceServices {
        services(store, Arc::new(ScriptedProvider::new(vec![])))
    }

    #[tokio::test]
    async fn patterns_filtered_by_type() {
        let tool = GetEngagementPatternsTool::new(svc(with_patterns().await));

        let result = tool.execute(&ctx(), json!({})).await.unwrap();
        let ToolResult::Success { data } = result else { panic!("expected success") };
        assert_eq!(data["patterns"][0]["id"], "p2");
        assert_eq!(data["patterns"].as_array().unwrap().len(), 2);

        let result = tool.execute(&ctx(), json!({"types": ["Hook"]})).await.unwrap();
        let ToolResult::Success { data } = result else { panic!("expected success") };
        assert_eq!(data["patterns"].as_array().unwrap().len(), 1);
        assert_eq!(data["patterns"][0]["id"], "p1");
    }

    #[tokio::test]
    async fn unknown_type_is_invalid() {
        let tool = GetEngagementPatternsTool::new(svc(with_patterns().await));
        let err = tool.execute(&ctx(), json!({"types": ["vibes"]})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn no_patterns_falls_back_to_recent_texts() {
        let tool = GetEngagementPatternsTool::new(svc(seeded_store(5).await));
        let result = tool.execute(&ctx(), json!({})).await.unwrap();
        let ToolResult::Error { diagnostic } = result else { panic!("expected error") };
        assert_eq!(diagnostic.suggested_actions[0], "reanalyze_corpus");
        let alt = diagnostic.alternative_data.unwrap();
        assert_eq!(alt["recent_texts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn success_is_recorded() {
        let store = with_patterns().await;
        let tool = RecordPatternSuccessTool::new(svc(store.clone()));

        let result = tool.execute(&ctx(), json!({"pattern_id": "p1"})).await.unwrap();
        let ToolResult::Success { data } = result else { panic!("expected success") };
        assert_eq!(data["usage_count"], 1);
        let updated = store.get_pattern("p1").await.unwrap().unwrap();
        assert!((updated.success_rate - 0.52).abs() < 1e-9);
    }

    #[tokio::test]
    async fn foreign_or_missing_pattern_is_a_diagnostic() {
        let store = with_patterns().await;
        let tool = RecordPatternSuccessTool::new(svc(store.clone()));

        for id in ["p3", "nope"] {
            let result = tool.execute(&ctx(), json!({"pattern_id": id})).await.unwrap();
            let ToolResult::Error { diagnostic } = result else { panic!("expected error") };
            assert_eq!(diagnostic.suggested_actions, vec!["get_engagement_patterns"]);
        }
        let untouched = store.get_pattern("p3").await.unwrap().unwrap();
        assert_eq!(untouched.usage_count, 0);
    }
}
