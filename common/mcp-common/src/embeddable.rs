//! In-process tool invocation
//!
//! [`EmbeddableMcp`] lets a host (or a test) call a server's tools directly,
//! without a stdio transport in between. Dispatch goes through the same tool
//! methods the MCP router uses, so results are identical.
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//!
//! let server = DharmaMcpServer::with_config(config);
//! let result = server
//!     .call_tool("dharma_generate", serde_json::json!({ "grammar_path": "url.dg" }))
//!     .await?;
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde_json::Value;

use crate::result::error_result;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The tool failed at the protocol level
    #[error("mcp error: {0}")]
    McpError(String),
}

impl From<rmcp::ErrorData> for EmbeddableError {
    fn from(err: rmcp::ErrorData) -> Self {
        EmbeddableError::McpError(err.message.to_string())
    }
}

pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// A server whose tools can be called in-process
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    /// Name used in MCP client configuration
    fn server_name(&self) -> &str;

    fn list_tools(&self) -> Vec<Tool>;

    /// Call `name` with JSON arguments.
    ///
    /// Tool failures, malformed arguments included, come back as `Ok` results
    /// flagged `is_error`. Only an unknown tool name is `Err`.
    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    fn server_version(&self) -> Option<&str> {
        None
    }
}

/// Tool arguments from a JSON value, with `null` meaning none.
///
/// Any other non-object value is reported in-band.
pub fn into_arguments(params: Value) -> Result<JsonObject, CallToolResult> {
    match params {
        Value::Null => Ok(JsonObject::new()),
        Value::Object(arguments) => Ok(arguments),
        other => Err(error_result(
            "internal_error",
            format!("Tool arguments must be a JSON object, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct LimitParams {
        #[serde(default)]
        limit: Option<usize>,
    }

    struct EchoServer;

    #[async_trait]
    impl EmbeddableMcp for EchoServer {
        fn server_name(&self) -> &str {
            "echo"
        }

        fn list_tools(&self) -> Vec<Tool> {
            vec![]
        }

        async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
            match name {
                "limit" => {
                    let arguments = match into_arguments(params) {
                        Ok(arguments) => arguments,
                        Err(result) => return Ok(result),
                    };
                    Ok(match crate::parse_arguments::<LimitParams>(arguments) {
                        Ok(p) => crate::in_band(crate::json_success(&p.limit.unwrap_or(0))),
                        Err(result) => result,
                    })
                }
                _ => Err(EmbeddableError::ToolNotFound(name.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = EchoServer.call_tool("missing", Value::Null).await;
        assert!(matches!(result, Err(EmbeddableError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_null_params_are_empty_object() {
        let result = EchoServer.call_tool("limit", Value::Null).await.unwrap();
        assert_eq!(crate::result_text(&result), "0");
    }

    #[tokio::test]
    async fn test_bad_params_are_tool_errors() {
        let result = EchoServer
            .call_tool("limit", serde_json::json!({ "limit": "many" }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));

        let result = EchoServer
            .call_tool("limit", serde_json::json!(["not", "an", "object"]))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(crate::result_text(&result).contains("must be a JSON object"));
    }
}
