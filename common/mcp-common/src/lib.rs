//! MCP Common - shared plumbing for the tool-wrapping MCP servers
//!
//! - **Initialization**: [`init_tracing`] and the `serve_stdio!` entry point
//! - **Results**: JSON tool responses, in-band error payloads, text resources
//! - **Runs**: the run query tools and run resources every server exposes
//! - **Embeddable**: [`EmbeddableMcp`] for in-process tool calls
//!
//! ```rust,ignore
//! // main.rs
//! mcp_common::serve_stdio!(DharmaMcpServer, "dharma_mcp", "DHARMA_LOG_LEVEL");
//!
//! // tool implementation
//! let params = match parse_arguments::<GenerateParams>(arguments) {
//!     Ok(params) => params,
//!     Err(result) => return Ok(result),
//! };
//! Ok(summary_result(run_generate(&self.orchestrator, params).await))
//! ```

pub mod embeddable;
pub mod error;
pub mod init;
pub mod result;
pub mod runs;

pub use embeddable::{into_arguments, EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use error::{IntoMcpError, McpResult};
pub use init::{init_tracing, log_level, DEFAULT_LOG_LEVEL};
pub use result::{error_result, in_band, json_success, parse_arguments, result_text, text_resource};
pub use runs::{run_failure, summary_result, RunResources};

pub use rmcp::{
    model::{CallToolResult, Content, JsonObject, Tool},
    ErrorData as McpError,
};

pub use async_trait::async_trait;
