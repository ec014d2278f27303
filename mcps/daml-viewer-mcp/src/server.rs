//! MCP Server implementation for the daml-viewer table generator
//!
//! Tools delegate to the handlers module. Finished runs are also exposed as
//! `damlviewer://runs/<id>` resources.

use mcp_common::{
    async_trait, into_arguments, parse_arguments, runs, text_resource, CallToolResult,
    EmbeddableError, EmbeddableMcp, EmbeddableResult, JsonObject, McpError, RunResources,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::schema_for_type},
    model::{
        ListResourcesResult, PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult,
        Resource, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    tool, tool_handler, tool_router, RoleServer,
};
use serde_json::Value;
use tool_runs::{RunOrchestrator, RunnerConfig, SummaryOptions};

use crate::handlers;
use crate::params::*;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "DAML_VIEWER_";

/// URI scheme prefix for run resources
pub const RESOURCE_PREFIX: &str = "damlviewer://runs/";

const RESOURCES: RunResources = RunResources::new(RESOURCE_PREFIX, "DAML Viewer");

/// The daml-viewer MCP Server
#[derive(Clone)]
pub struct DamlViewerMcpServer {
    orchestrator: RunOrchestrator,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Tool Router - Each tool delegates to its handler
// ============================================================================

#[tool_router]
impl DamlViewerMcpServer {
    /// Create a server from `DAML_VIEWER_*` settings and prepare its roots
    pub fn from_env() -> anyhow::Result<Self> {
        let config = RunnerConfig::from_env(ENV_PREFIX, RunnerConfig::for_tool("daml-viewer"))?;

        tracing::info!("Output directory: {}", config.output_dir.display());
        tracing::info!("Upload directory: {}", config.upload_dir.display());
        tracing::info!("Max concurrent: {}", config.max_concurrent);
        tracing::info!(
            "Path policy: {}",
            if config.allow_any_path { "allow-any" } else { "restricted" }
        );

        let server = Self::with_config(config);
        server.orchestrator.prepare_roots()?;
        Ok(server)
    }

    /// Create a server with explicit config
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            orchestrator: RunOrchestrator::new(config),
            tool_router: Self::tool_router(),
        }
    }

    pub fn orchestrator(&self) -> &RunOrchestrator {
        &self.orchestrator
    }

    #[tool(
        description = "Generate a DAML access-control markdown table from a project directory or a single .daml file",
        input_schema = schema_for_type::<GenerateTableParams>()
    )]
    async fn damlviewer_generate_table(
        &self,
        arguments: JsonObject,
    ) -> Result<CallToolResult, McpError> {
        Ok(match parse_arguments::<GenerateTableParams>(arguments) {
            Ok(params) => handlers::generate_table(&self.orchestrator, params).await,
            Err(result) => result,
        })
    }

    #[tool(
        description = "Retrieve results from a previous run by run ID",
        input_schema = schema_for_type::<GetRunResultsParams>()
    )]
    async fn get_run_results(&self, arguments: JsonObject) -> Result<CallToolResult, McpError> {
        let params = match parse_arguments::<GetRunResultsParams>(arguments) {
            Ok(params) => params,
            Err(result) => return Ok(result),
        };
        let options = SummaryOptions {
            include_stdout: params.include_stdout,
            include_stderr: params.include_stderr,
            include_table_preview: params.include_table_preview,
        };
        Ok(runs::get_run_results(&self.orchestrator, &params.run_id, options).await)
    }

    #[tool(
        description = "List finished DAML viewer runs (most recent first)",
        input_schema = schema_for_type::<ListRunsParams>()
    )]
    async fn list_runs(&self, arguments: JsonObject) -> Result<CallToolResult, McpError> {
        Ok(match parse_arguments::<ListRunsParams>(arguments) {
            Ok(params) => runs::list_runs(&self.orchestrator, params.status.as_deref(), params.limit),
            Err(result) => result,
        })
    }

    #[tool(description = "List currently running DAML viewer jobs")]
    async fn list_active_runs(&self) -> Result<CallToolResult, McpError> {
        Ok(runs::list_active_runs(&self.orchestrator))
    }
}

// ============================================================================
// Run Resources
// ============================================================================

impl DamlViewerMcpServer {
    /// One resource per finished run
    pub fn run_resources(&self) -> Vec<Resource> {
        RESOURCES.list(&self.orchestrator)
    }

    /// Full summary for a run resource, or a not-found payload
    pub async fn read_run_resource(&self, uri: &str) -> String {
        RESOURCES.read(&self.orchestrator, uri).await
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for DamlViewerMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "DAML access-control table generator. Inputs must live under the \
                 configured upload or output roots. Each call records a run that \
                 can be retrieved later with get_run_results."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(self.run_resources()))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let text = self.read_run_resource(&request.uri).await;
        Ok(text_resource(request.uri, text))
    }
}

// ============================================================================
// EmbeddableMcp Implementation
// ============================================================================

#[async_trait]
impl EmbeddableMcp for DamlViewerMcpServer {
    fn server_name(&self) -> &str {
        "daml-viewer"
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        let arguments = match into_arguments(params) {
            Ok(arguments) => arguments,
            Err(result) => return Ok(result),
        };

        match name {
            "damlviewer_generate_table" => self
                .damlviewer_generate_table(arguments)
                .await
                .map_err(Into::into),

            "get_run_results" => self.get_run_results(arguments).await.map_err(Into::into),

            "list_runs" => self.list_runs(arguments).await.map_err(Into::into),

            "list_active_runs" => self.list_active_runs().await.map_err(Into::into),

            _ => Err(EmbeddableError::ToolNotFound(name.to_string())),
        }
    }

    fn server_version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }
}
