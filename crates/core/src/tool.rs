//! Tool contract: the fixed catalogue the orchestrating model can call.
//!
//! Tool names form a closed enum, so adding or removing a tool is a
//! compile-checked change: the catalogue builder in `voiceprint-tools`
//! matches exhaustively over [`ToolName::ALL`].
//!
//! Every execution yields a [`ToolResult`]. Failures are not thrown past the
//! registry; they become a [`Diagnostic`] the model reads to pick its next move.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ToolError;
use crate::message::ConversationId;
use crate::provider::ToolDefinition;

/// Every tool the orchestrator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    GetUserProfile,
    GetVoiceFingerprint,
    GetEngagementPatterns,
    GetTopExamples,
    GetPreviousOutput,
    CheckUserStatus,
    DiagnoseDataGaps,
    ReanalyzeCorpus,
    GenerateContent,
    ResolveReference,
    RecordPatternSuccess,
}

impl ToolName {
    pub const ALL: [ToolName; 11] = [
        Self::GetUserProfile,
        Self::GetVoiceFingerprint,
        Self::GetEngagementPatterns,
        Self::GetTopExamples,
        Self::GetPreviousOutput,
        Self::CheckUserStatus,
        Self::DiagnoseDataGaps,
        Self::ReanalyzeCorpus,
        Self::GenerateContent,
        Self::ResolveReference,
        Self::RecordPatternSuccess,
    ];

    /// The wire name sent to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetUserProfile => "get_user_profile",
            Self::GetVoiceFingerprint => "get_voice_fingerprint",
            Self::GetEngagementPatterns => "get_engagement_patterns",
            Self::GetTopExamples => "get_top_examples",
            Self::GetPreviousOutput => "get_previous_output",
            Self::CheckUserStatus => "check_user_status",
            Self::DiagnoseDataGaps => "diagnose_data_gaps",
            Self::ReanalyzeCorpus => "reanalyze_corpus",
            Self::GenerateContent => "generate_content",
            Self::ResolveReference => "resolve_reference",
            Self::RecordPatternSuccess => "record_pattern_success",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to execute a tool, as decoded from the model's turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name as the model sent it; may not be a known tool
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Who a tool runs on behalf of.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub user_id: String,
    pub conversation_id: ConversationId,
}

/// Why a tool could not answer, and what to try instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub reason: String,

    /// Ordered next steps, usually other tool names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_actions: Vec<String>,

    /// Fallback data the caller can use without another round-trip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_data: Option<serde_json::Value>,
}

impl Diagnostic {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            suggested_actions: Vec::new(),
            alternative_data: None,
        }
    }

    pub fn suggest(mut self, action: impl Into<String>) -> Self {
        self.suggested_actions.push(action.into());
        self
    }

    pub fn with_alternative(mut self, data: serde_json::Value) -> Self {
        self.alternative_data = Some(data);
        self
    }
}

/// The outcome of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { data: serde_json::Value },
    Error { diagnostic: Diagnostic },
}

impl ToolResult {
    pub fn success(data: serde_json::Value) -> Self {
        Self::Success { data }
    }

    pub fn failure(diagnostic: Diagnostic) -> Self {
        Self::Error { diagnostic }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The diagnostic reason, if this is a failure.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Error { diagnostic } => Some(&diagnostic.reason),
        }
    }

    /// JSON text appended to the conversation as the tool turn.
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","diagnostic":{{"reason":"unserializable tool result: {e}"}}}}"#)
        })
    }
}

impl From<ToolError> for Diagnostic {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => Diagnostic::new(format!("Unknown tool '{name}'"))
                .with_alternative(serde_json::json!(
                    ToolName::ALL.iter().map(ToolName::as_str).collect::<Vec<_>>()
                )),
            ToolError::InvalidArguments(reason) => {
                Diagnostic::new(format!("Invalid arguments: {reason}"))
                    .suggest("Fix the arguments to match the tool schema and call again")
            }
            ToolError::ExecutionFailed { tool_name, reason } => {
                Diagnostic::new(format!("{tool_name} failed: {reason}"))
                    .suggest(ToolName::DiagnoseDataGaps.as_str())
            }
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool. Expected, recoverable conditions should come back as
    /// `ToolResult::Error` with a specific diagnostic; `Err` is for everything else.
    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, keyed by [`ToolName`].
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: ToolName) -> Option<&dyn Tool> {
        self.tools.get(&name).map(|t| t.as_ref())
    }

    /// All tool definitions, in catalogue order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<ToolName> {
        self.tools.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call. Never fails: errors come back as diagnostics.
    pub async fn execute(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        let tool = ToolName::parse(&call.name).and_then(|name| self.tools.get(&name));
        let Some(tool) = tool else {
            tracing::warn!(tool = %call.name, "Model requested an unknown tool");
            return ToolResult::failure(ToolError::NotFound(call.name.clone()).into());
        };
        match tool.execute(ctx, call.arguments.clone()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(tool = %call.name, error = %e, "Tool error folded into a diagnostic");
                ToolResult::failure(e.into())
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
