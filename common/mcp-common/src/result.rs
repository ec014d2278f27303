//! Helpers for building tool and resource responses

use rmcp::model::{
    CallToolResult, Content, JsonObject, RawContent, ReadResourceResult, ResourceContents,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::error::{IntoMcpError, McpResult};

/// Pretty-printed JSON response
pub fn json_success<T: Serialize>(data: &T) -> McpResult<CallToolResult> {
    let json = serde_json::to_string_pretty(data).map_err(IntoMcpError::into_mcp_error)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Tool-level failure reported in-band.
///
/// The payload is `{"error": kind, "message": message}` and the result is
/// flagged with `is_error`, so clients see a structured failure rather than a
/// protocol error.
pub fn error_result(kind: &str, message: impl Into<String>) -> CallToolResult {
    let payload = json!({ "error": kind, "message": message.into() });
    CallToolResult::error(vec![Content::text(payload.to_string())])
}

/// Fold whatever a handler produced into a tool result.
///
/// Protocol errors that reach this point are logged and reported in-band as
/// `internal_error`.
pub fn in_band(result: McpResult<CallToolResult>) -> CallToolResult {
    result.unwrap_or_else(|err| {
        tracing::error!(kind = "internal_error", "{}", err.message);
        error_result("internal_error", err.message.to_string())
    })
}

/// Deserialize tool arguments, reporting a mismatch as an `internal_error` result
pub fn parse_arguments<T: DeserializeOwned>(arguments: JsonObject) -> Result<T, CallToolResult> {
    serde_json::from_value(Value::Object(arguments)).map_err(|err| {
        tracing::warn!(kind = "internal_error", "invalid tool arguments: {}", err);
        error_result("internal_error", format!("Invalid arguments: {}", err))
    })
}

/// Single text resource body for `uri`
pub fn text_resource(uri: impl Into<String>, text: impl Into<String>) -> ReadResourceResult {
    ReadResourceResult {
        contents: vec![ResourceContents::text(text.into(), uri.into())],
    }
}

/// Concatenated text content of a tool result
pub fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
