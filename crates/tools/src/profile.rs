//! Profile and onboarding-status lookups.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use voiceprint_core::error::ToolError;
use voiceprint_core::store::UserDirectory;
use voiceprint_core::tool::{Diagnostic, Tool, ToolContext, ToolName, ToolResult};

use crate::args::failed;

/// Returns the user's public profile together with their data flags.
pub struct GetUserProfileTool {
    users: Arc<dyn UserDirectory>,
}

impl GetUserProfileTool {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Tool for GetUserProfileTool {
    fn name(&self) -> ToolName {
        ToolName::GetUserProfile
    }

    fn description(&self) -> &str {
        "Get the user's profile (name, headline, about, niche) and whether their \
         writing samples, voice fingerprint and engagement patterns are available."
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
        let profile = self
            .users
            .profile(&ctx.user_id)
            .await
            .map_err(|e| failed(self.name(), e))?;

        Ok(match profile {
            Some(profile) => ToolResult::success(json!({ "profile": profile, "status": status })),
            None => ToolResult::failure(
                Diagnostic::new("No profile on file for this user")
                    .suggest(ToolName::CheckUserStatus.as_str())
                    .with_alternative(json!({ "status": status })),
            ),
        })
    }
}

/// Reports the onboarding flags from the diagnostics collaborator.
pub struct CheckUserStatusTool {
    users: Arc<dyn UserDirectory>,
}

impl CheckUserStatusTool {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Tool for CheckUserStatusTool {
    fn name(&self) -> ToolName {
        ToolName::CheckUserStatus
    }

    fn description(&self) -> &str {
        "Check which of the user's data is in place: writing corpus, voice \
         fingerprint, engagement patterns. Call this first when another tool fails."
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
        let ready = status.is_ready();
        let mut data = serde_json::to_value(&status).map_err(|e| failed(self.name(), e))?;
        data["ready"] = json!(ready);
        Ok(ToolResult::success(data))
    }
}
