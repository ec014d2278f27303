//! Protocol-level error helpers
//!
//! Tool failures are reported in-band with [`crate::error_result`]. Errors
//! built here only exist until [`crate::in_band`] folds them into a result.

use rmcp::ErrorData as McpError;

pub type McpResult<T> = Result<T, McpError>;

/// Conversion into an MCP protocol error
pub trait IntoMcpError {
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("JSON error: {}", self), None)
    }
}
