//! daml-viewer MCP Library
//!
//! Wraps the `daml-viewer` CLI, which renders a markdown access-control table
//! for a DAML project or a single `.daml` file. Runs are admitted, executed
//! and recorded by [`tool_runs::RunOrchestrator`].
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use daml_viewer_mcp::DamlViewerMcpServer;
//! use mcp_common::EmbeddableMcp;
//!
//! let server = DamlViewerMcpServer::with_config(config);
//! let result = server
//!     .call_tool("damlviewer_generate_table", serde_json::json!({ "path": "/app/uploads/model" }))
//!     .await?;
//! ```

pub mod handlers;
pub mod params;
pub mod server;

pub use server::DamlViewerMcpServer;

pub use params::*;
