//! Content generation through the voice pipeline.

use async_trait::async_trait;
use serde_json::{Value, json};
use voiceprint_core::error::{Error, ToolError, VoiceError};
use voiceprint_core::tool::{Diagnostic, Tool, ToolContext, ToolName, ToolResult};
use voiceprint_style::GenerationRequest;

use crate::args::{IMPORT_HINT, failed, optional_str, required_str};
use crate::services::VoiceServices;

pub struct GenerateContentTool {
    services: VoiceServices,
}

impl GenerateContentTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for GenerateContentTool {
    fn name(&self) -> ToolName {
        ToolName::GenerateContent
    }

    fn description(&self) -> &str {
        "Write a post in the user's own voice. Returns the text with an authenticity \
         score from 1 to 10 and any remaining issues."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": { "type": "string", "description": "What the post is about" },
                "angle": {
                    "type": "string",
                    "description": "Optional framing, e.g. 'lessons from a failed launch'"
                }
            },
            "required": ["topic"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<ToolResult, ToolError> {
        let mut request = GenerationRequest::new(&ctx.user_id, required_str(&arguments, "topic")?);
        if let Some(angle) = optional_str(&arguments, "angle") {
            request = request.with_angle(angle);
        }

        match self.services.pipeline.generate(&request).await {
            Ok(content) => Ok(ToolResult::success(json!({
                "text": content.text,
                "authenticity_score": content.score,
                "issues": content.issues,
                "regenerated": content.regenerated,
            }))),
            Err(Error::Voice(VoiceError::AuthenticityRejected { score, issues })) => {
                Ok(ToolResult::failure(
                    Diagnostic::new(format!(
                        "Both drafts read as off-voice (authenticity {score}/10), nothing was returned"
                    ))
                    .suggest("Try a different angle or a narrower topic")
                    .suggest(ToolName::GetTopExamples.as_str())
                    .with_alternative(json!({ "issues": issues })),
                ))
            }
            Err(Error::Voice(VoiceError::NoCorpus { .. })) => Ok(ToolResult::failure(
                Diagnostic::new("The user has no writing samples to learn their voice from")
                    .suggest(IMPORT_HINT),
            )),
            Err(Error::Voice(VoiceError::IncompleteFingerprint { missing })) => {
                Ok(ToolResult::failure(
                    Diagnostic::new(format!(
                        "The voice fingerprint is missing: {}",
                        missing.join(", ")
                    ))
                    .suggest(ToolName::ReanalyzeCorpus.as_str()),
                ))
            }
            Err(e) => Err(failed(self.name(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{GOOD_DRAFT, ctx, fingerprint_reply, judge, seeded_store, services};
    use std::sync::Arc;
    use voiceprint_core::testing::{ScriptedProvider, text_response};
    use voiceprint_memory::InMemoryStore;

    #[tokio::test]
    async fn generates_with_score() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            fingerprint_reply(),
            text_response(GOOD_DRAFT),
            judge(9),
        ]));
        let tool = GenerateContentTool::new(services(seeded_store(3).await, provider));

        let result = tool.execute(&ctx(), json!({"topic": "launch day"})).await.unwrap();
        let ToolResult::Success { data } = result else { panic!("expected success") };
        assert_eq!(data["text"], GOOD_DRAFT);
        assert_eq!(data["authenticity_score"], 9);
        assert_eq!(data["regenerated"], false);
    }

    #[tokio::test]
    async fn rejection_returns_issues_not_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            fingerprint_reply(),
            text_response("A robust solution for everyone."),
            text_response("Truly a robust solution."),
        ]));
        let tool = GenerateContentTool::new(services(seeded_store(3).await, provider));

        let result = tool.execute(&ctx(), json!({"topic": "launch day"})).await.unwrap();
        let ToolResult::Error { diagnostic } = result else { panic!("expected error") };
        assert!(diagnostic.reason.contains("0/10"));
        let issues = &diagnostic.alternative_data.unwrap()["issues"];
        assert!(issues[0].as_str().unwrap().contains("robust solution"));
    }

    #[tokio::test]
    async fn topic_is_required() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let tool = GenerateContentTool::new(services(seeded_store(1).await, provider));
        let err = tool.execute(&ctx(), json!({"angle": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn no_corpus_asks_for_import() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let tool = GenerateContentTool::new(services(Arc::new(InMemoryStore::new()), provider));
        let result = tool.execute(&ctx(), json!({"topic": "anything"})).await.unwrap();
        let ToolResult::Error { diagnostic } = result else { panic!("expected error") };
        assert_eq!(diagnostic.suggested_actions, vec![IMPORT_HINT]);
    }
}
