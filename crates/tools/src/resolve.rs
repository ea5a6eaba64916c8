//! Resolves vague references ("my startup", "that tool") against the knowledge map.

use async_trait::async_trait;
use serde_json::{Value, json};
use voiceprint_core::error::{Error, ToolError, VoiceError};
use voiceprint_core::tool::{Diagnostic, Tool, ToolContext, ToolName, ToolResult};

use crate::args::{IMPORT_HINT, failed, required_str};
use crate::services::VoiceServices;

pub struct ResolveReferenceTool {
    services: VoiceServices,
}

impl ResolveReferenceTool {
    pub fn new(services: VoiceServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for ResolveReferenceTool {
    fn name(&self) -> ToolName {
        ToolName::ResolveReference
    }

    fn description(&self) -> &str {
        "Find which of the user's projects or tools a vague reference points to, \
         e.g. \"my startup\" or \"that tool I always use\"."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The reference, in the user's words" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, arguments: Value) -> Result<ToolResult, ToolError> {
        let query = required_str(&arguments, "query")?;
        let map = match self.services.knowledge.get(&ctx.user_id).await {
            Ok(map) => map,
            Err(Error::Voice(VoiceError::NoCorpus { .. })) => {
                return Ok(ToolResult::failure(
                    Diagnostic::new("No posts on file to learn the user's projects from")
                        .suggest(IMPORT_HINT),
                ));
            }
            Err(e) => return Err(failed(self.name(), e)),
        };

        let matches = voiceprint_style::resolve(&map, query);
        if matches.is_empty() {
            return Ok(ToolResult::failure(
                Diagnostic::new(format!("Nothing the user has written about matches \"{query}\""))
                    .suggest("Ask the user which project or tool they mean")
                    .with_alternative(json!({ "known": map.keywords().collect::<Vec<_>>() })),
            ));
        }

        Ok(ToolResult::success(json!({ "query": query, "matches": matches })))
    }
}
