//! The user's best-performing texts, with a recency fallback.

use async_trait::async_trait;
use serde_json::{Value, json};
use voiceprint_core::corpus::CorpusQuery;
use voiceprint_core::error::ToolError;
use voiceprint_core::tool::{Diagnostic, Tool, ToolContext, ToolName, ToolResult};

use crate::args::{IMPORT_HINT, bounded_usize, exemplar_summaries, failed};
use crate::services::VoiceServices;

const DEFAULT_EXAMPLES: usize = 3;
const MAX_EXAMPLES: usize = 10;

pub struct GetTopExamplesTool {
    services: VoiceServices,
}

impl GetTopExamplesTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for GetTopExamplesTool {
    fn name(&self) -> ToolName {
        ToolName::GetTopExamples
    }

    fn description(&self) -> &str {
        "Get the user's highest-engagement posts with their hooks, to use as examples \
         of what works for their audience."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "description": "How many posts (default 3, max 10)" }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<ToolResult, ToolError> {
        let limit = bounded_usize(&arguments, "limit", DEFAULT_EXAMPLES, MAX_EXAMPLES);
        let corpus = &self.services.stores.corpus;

        let count = corpus.count(&ctx.user_id).await.map_err(|e| failed(self.name(), e))?;
        if count == 0 {
            return Ok(ToolResult::failure(
                Diagnostic::new("The user has not imported any posts").suggest(IMPORT_HINT),
            ));
        }

        let top = corpus
            .list_exemplars(&ctx.user_id, CorpusQuery::top(limit))
            .await
            .map_err(|e| failed(self.name(), e))?;
        if top.is_empty() {
            let recent = corpus
                .list_exemplars(&ctx.user_id, CorpusQuery::recent(limit))
                .await
                .map_err(|e| failed(self.name(), e))?;
            return Ok(ToolResult::failure(
                Diagnostic::new(format!(
                    "None of the user's {count} posts have engagement data (unanalyzed)"
                ))
                .suggest(ToolName::ReanalyzeCorpus.as_str())
                .with_alternative(json!({ "recent_texts": exemplar_summaries(&recent) })),
            ));
        }

        Ok(ToolResult::success(json!({
            "examples": exemplar_summaries(&top),
            "corpus_size": count,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, exemplar, seeded_store, services};
    use std::sync::Arc;
    use voiceprint_core::testing::ScriptedProvider;
    use voiceprint_memory::InMemoryStore;

    fn tool(store: Arc<InMemoryStore>) -> GetTopExamplesTool {
        GetTopExamplesTool::new(services(store, Arc::new(ScriptedProvider::new(vec![]))))
    }

    #[tokio::test]
    async fn best_posts_first() {
        let result = tool(seeded_store(5).await).execute(&ctx(), json!({"limit": 2})).await.unwrap();
        let ToolResult::Success { data } = result else { panic!("expected success") };
        let examples = data["examples"].as_array().unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0]["id"], "t5");
        assert_eq!(examples[0]["hook"], "Building Trailhead in public.");
        assert_eq!(data["corpus_size"], 5);
    }

    #[tokio::test]
    async fn empty_corpus_asks_for_import() {
        let result = tool(Arc::new(InMemoryStore::new())).execute(&ctx(), json!({})).await.unwrap();
        let ToolResult::Error { diagnostic } = result else { panic!("expected error") };
        assert_eq!(diagnostic.suggested_actions, vec![IMPORT_HINT]);
    }

    #[tokio::test]
    async fn unanalysed_corpus_offers_recent_posts() {
        let store = Arc::new(InMemoryStore::new());
        store.add_exemplar(exemplar("a", "First post", None, 2)).await;
        store.add_exemplar(exemplar("b", "Second post", None, 1)).await;

        let result = tool(store).execute(&ctx(), json!({})).await.unwrap();
        let ToolResult::Error { diagnostic } = result else { panic!("expected error") };
        assert!(diagnostic.reason.contains("unanalyzed"));
        assert_eq!(diagnostic.suggested_actions, vec!["reanalyze_corpus"]);
        let alt = diagnostic.alternative_data.unwrap();
        assert_eq!(alt["recent_texts"][0]["id"], "b");
    }
}
