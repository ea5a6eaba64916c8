//! Earlier assistant replies in the current conversation.

use async_trait::async_trait;
use serde_json::{Value, json};
use voiceprint_core::error::ToolError;
use voiceprint_core::message::Role;
use voiceprint_core::tool::{Diagnostic, Tool, ToolContext, ToolName, ToolResult};

use crate::args::{bounded_usize, failed};
use crate::services::VoiceServices;

const MAX_LOOKBACK: usize = 20;

pub struct GetPreviousOutputTool {
    services: VoiceServices,
}

impl GetPreviousOutputTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for GetPreviousOutputTool {
    fn name(&self) -> ToolName {
        ToolName::GetPreviousOutput
    }

    fn description(&self) -> &str {
        "Get something you wrote earlier in this conversation, e.g. when the user \
         says \"make it shorter\" or \"use the second one\"."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "index": {
                    "type": "integer",
                    "description": "1 = your most recent reply, 2 = the one before, ..."
                }
            }
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<ToolResult, ToolError> {
        let index = bounded_usize(&arguments, "index", 1, MAX_LOOKBACK);
        let turns = self
            .services
            .stores
            .conversations
            .recent(&ctx.conversation_id, 0, &[Role::Assistant])
            .await
            .map_err(|e| failed(self.name(), e))?;

        let replies: Vec<&str> = turns
            .iter()
            .rev()
            .filter(|m| !m.requests_tools() && !m.content.trim().is_empty())
            .map(|m| m.content.as_str())
            .collect();

        if replies.is_empty() {
            return Ok(ToolResult::failure(
                Diagnostic::new("Nothing has been written in this conversation yet")
                    .suggest(ToolName::GenerateContent.as_str()),
            ));
        }

        match replies.get(index - 1) {
            Some(text) => Ok(ToolResult::success(json!({ "index": index, "text": text }))),
            None => Ok(ToolResult::failure(
                Diagnostic::new(format!(
                    "Only {} earlier replies exist, cannot go back {index}",
                    replies.len()
                ))
                .with_alternative(json!({ "index": 1, "text": replies[0] })),
            )),
        }
    }
}
