//! Argument helpers shared by the tools.

use serde_json::Value;
use voiceprint_core::corpus::ExemplarText;
use voiceprint_core::error::ToolError;
use voiceprint_core::tool::ToolName;

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing '{key}'")))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A positive integer argument, defaulted and capped.
pub(crate) fn bounded_usize(args: &Value, key: &str, default: usize, max: usize) -> usize {
    args.get(key)
        .and_then(Value::as_u64)
        .map_or(default, |n| n as usize)
        .clamp(1, max)
}

pub(crate) fn failed(tool: ToolName, reason: impl std::fmt::Display) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.as_str().to_string(),
        reason: reason.to_string(),
    }
}

/// Compact view of texts for tool output and alternative data.
pub(crate) fn exemplar_summaries(texts: &[ExemplarText]) -> Value {
    Value::Array(
        texts
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "hook": t.hook(),
                    "text": t.text,
                    "engagement": t.engagement,
                    "published_at": t.published_at.to_rfc3339(),
                })
            })
            .collect(),
    )
}

/// The next step when a user has no corpus at all. Import happens outside the chat.
pub(crate) const IMPORT_HINT: &str =
    "Ask the user to import their posts (voiceprint import --user <id> --file posts.json)";
