//! Fingerprint lookup and full corpus reanalysis.

use async_trait::async_trait;
use serde_json::json;
use voiceprint_core::error::{Error, ToolError, VoiceError};
use voiceprint_core::tool::{Diagnostic, Tool, ToolContext, ToolName, ToolResult};

use crate::args::{IMPORT_HINT, failed};
use crate::services::VoiceServices;

fn no_corpus() -> ToolResult {
    ToolResult::failure(
        Diagnostic::new("The user has no writing samples, so there is no voice to analyse")
            .suggest(IMPORT_HINT)
            .suggest(ToolName::CheckUserStatus.as_str()),
    )
}

/// Returns the cached fingerprint, extracting one on a miss.
pub struct GetVoiceFingerprintTool {
    services: VoiceServices,
}

impl GetVoiceFingerprintTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for GetVoiceFingerprintTool {
    fn name(&self) -> ToolName {
        ToolName::GetVoiceFingerprint
    }

    fn description(&self) -> &str {
        "Get the user's voice fingerprint: hook patterns, signature and forbidden \
         phrases, sentence length, formatting habits and narrative structure."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        _arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let fingerprint = match self.services.fingerprints.get(&ctx.user_id).await {
            Ok(fp) => fp,
            Err(Error::Voice(VoiceError::NoCorpus { .. })) => return Ok(no_corpus()),
            Err(e) => return Err(failed(self.name(), e)),
        };
        let stored = self
            .services
            .fingerprints
            .peek(&ctx.user_id)
            .await
            .map_err(|e| failed(self.name(), e))?;

        Ok(ToolResult::success(json!({
            "fingerprint": fingerprint,
            "source": if stored.is_some() { "extracted" } else { "emergency_default" },
            "updated_at": stored.map(|s| s.updated_at.to_rfc3339()),
        })))
    }
}

/// Rebuilds fingerprint, knowledge map and engagement patterns from the corpus.
pub struct ReanalyzeCorpusTool {
    services: VoiceServices,
}

impl ReanalyzeCorpusTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for ReanalyzeCorpusTool {
    fn name(&self) -> ToolName {
        ToolName::ReanalyzeCorpus
    }

    fn description(&self) -> &str {
        "Re-run the full analysis of the user's writing: voice fingerprint, known \
         projects and tools, and engagement patterns. Slow; use when data is missing or stale."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        _arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let user_id = ctx.user_id.as_str();
        let services = &self.services;

        match services.fingerprints.refresh(user_id).await {
            Ok(_) => {}
            Err(Error::Voice(VoiceError::NoCorpus { .. })) => return Ok(no_corpus()),
            Err(e) => return Err(failed(self.name(), e)),
        }
        let extracted = services
            .fingerprints
            .peek(user_id)
            .await
            .map_err(|e| failed(self.name(), e))?
            .is_some();

        let knowledge = services
            .knowledge
            .refresh(user_id)
            .await
            .map_err(|e| failed(self.name(), e))?;
        let patterns = services
            .analyzer
            .analyze(user_id)
            .await
            .map_err(|e| failed(self.name(), e))?;

        Ok(ToolResult::success(json!({
            "fingerprint_source": if extracted { "extracted" } else { "emergency_default" },
            "knowledge_entries": knowledge.len(),
            "patterns_found": patterns.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ctx, fingerprint_reply, seeded_store, services};
    use std::sync::Arc;
    use voiceprint_core::testing::{ScriptedProvider, json_response, text_response};
    use voiceprint_memory::InMemoryStore;

    #[tokio::test]
    async fn fingerprint_is_extracted_then_cached() {
        let provider = Arc::new(ScriptedProvider::new(vec![fingerprint_reply()]));
        let tool = GetVoiceFingerprintTool::new(services(seeded_store(3).await, provider.clone()));

        for _ in 0..2 {
            let result = tool.execute(&ctx(), json!({})).await.unwrap();
            let ToolResult::Success { data } = result else { panic!("expected success") };
            assert_eq!(data["source"], "extracted");
            assert_eq!(data["fingerprint"]["signature_phrases"][0], "shipped it anyway");
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn no_corpus_suggests_import() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let tool = GetVoiceFingerprintTool::new(services(Arc::new(InMemoryStore::new()), provider));
        let result = tool.execute(&ctx(), json!({})).await.unwrap();
        let ToolResult::Error { diagnostic } = result else { panic!("expected error") };
        assert_eq!(diagnostic.suggested_actions[0], IMPORT_HINT);
        assert_eq!(diagnostic.suggested_actions[1], "check_user_status");
    }

    #[tokio::test]
    async fn reanalysis_rebuilds_everything() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            fingerprint_reply(),
            json_response(json!({"patterns": [
                {"type": "hook", "description": "Leads with a number", "source_ids": ["t1"]}
            ]})),
        ]));
        let store = seeded_store(3).await;
        let tool = ReanalyzeCorpusTool::new(services(store, provider));

        let result = tool.execute(&ctx(), json!({})).await.unwrap();
        let ToolResult::Success { data } = result else { panic!("expected success") };
        assert_eq!(data["fingerprint_source"], "extracted");
        assert_eq!(data["knowledge_entries"], 1);
        assert_eq!(data["patterns_found"], 1);
    }

    #[tokio::test]
    async fn unusable_extraction_reports_emergency_default() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            text_response("not json"),
            json_response(json!({"patterns": []})),
        ]));
        let tool = ReanalyzeCorpusTool::new(services(seeded_store(1).await, provider));

        let result = tool.execute(&ctx(), json!({})).await.unwrap();
        let ToolResult::Success { data } = result else { panic!("expected success") };
        assert_eq!(data["fingerprint_source"], "emergency_default");
        assert_eq!(data["patterns_found"], 0);
    }
}
