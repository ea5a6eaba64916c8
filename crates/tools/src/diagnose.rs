//! Explains what data is missing and which tools fill the gap, in order.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use voiceprint_core::error::ToolError;
use voiceprint_core::store::UserDirectory;
use voiceprint_core::tool::{Tool, ToolContext, ToolName, ToolResult};
use voiceprint_core::user::UserStatus;

use crate::args::{IMPORT_HINT, failed};

/// The gaps in a user's data and the ordered steps that close them.
pub fn data_gaps(status: &UserStatus) -> (Vec<String>, Vec<String>) {
    let mut gaps = Vec::new();
    let mut next = Vec::new();

    if !status.has_corpus {
        gaps.push("No writing samples have been imported".to_string());
        next.push(IMPORT_HINT.to_string());
        return (gaps, next);
    }

    if !status.has_fingerprint {
        gaps.push("No voice fingerprint has been extracted yet".to_string());
    }
    if status.analyzed_texts == 0 {
        gaps.push(format!(
            "None of the {} texts carry engagement data; top examples fall back to the most recent",
            status.corpus_size
        ));
    }
    if !status.has_patterns {
        gaps.push("No engagement patterns have been analysed".to_string());
    }

    if !status.has_fingerprint || !status.has_patterns {
        next.push(ToolName::ReanalyzeCorpus.as_str().to_string());
    }
    if !status.has_patterns {
        next.push(ToolName::GetTopExamples.as_str().to_string());
    }
    next.push(ToolName::GenerateContent.as_str().to_string());

    (gaps, next)
}

pub struct DiagnoseDataGapsTool {
    users: Arc<dyn UserDirectory>,
}

impl DiagnoseDataGapsTool {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Tool for DiagnoseDataGapsTool {
    fn name(&self) -> ToolName {
        ToolName::DiagnoseDataGaps
    }

    fn description(&self) -> &str {
        "List what is missing from the user's data and the tools to call, in order, \
         to fix it. Use this when a lookup comes back empty."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        _arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let status = self
            .users
            .status(&ctx.user_id)
            .await
            .map_err(|e| failed(self.name(), e))?;
        let (gaps, next_actions) = data_gaps(&status);
        Ok(ToolResult::success(json!({
            "gaps": gaps,
            "next_actions": next_actions,
            "status": status,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_corpus_only_suggests_import() {
        let (gaps, next) = data_gaps(&UserStatus::default());
        assert_eq!(gaps.len(), 1);
        assert_eq!(next, vec![IMPORT_HINT]);
    }

    #[test]
    fn unanalysed_corpus_suggests_reanalysis_first() {
        let status = UserStatus { has_corpus: true, corpus_size: 4, ..UserStatus::default() };
        let (gaps, next) = data_gaps(&status);
        assert_eq!(gaps.len(), 3);
        assert_eq!(next, vec!["reanalyze_corpus", "get_top_examples", "generate_content"]);
    }

    #[test]
    fn ready_user_goes_straight_to_generation() {
        let status = UserStatus {
            has_corpus: true,
            has_fingerprint: true,
            has_patterns: true,
            corpus_size: 4,
            analyzed_texts: 4,
            fingerprint_updated_at: None,
        };
        let (gaps, next) = data_gaps(&status);
        assert!(gaps.is_empty());
        assert_eq!(next, vec!["generate_content"]);
    }
}
