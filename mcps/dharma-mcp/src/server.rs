//! MCP Server implementation for the Dharma grammar fuzzer

use std::path::{Path, PathBuf};

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
pub const ENV_PREFIX: &str = "DHARMA_";

/// Grammar library used when `DHARMA_GRAMMAR_DIR` is unset
pub const DEFAULT_GRAMMAR_DIR: &str = "/app/grammars";

/// URI scheme prefix for run resources
pub const RESOURCE_PREFIX: &str = "dharma://runs/";

const RESOURCES: RunResources = RunResources::new(RESOURCE_PREFIX, "Dharma");

/// The Dharma MCP Server
#[derive(Clone)]
pub struct DharmaMcpServer {
    orchestrator: RunOrchestrator,
    grammar_dir: PathBuf,
    tool_router: ToolRouter<Self>,
}

// ============================================================================
// Tool Router - Each tool delegates to its handler
// ============================================================================

#[tool_router]
impl DharmaMcpServer {
    /// Built-in settings: the `dharma` executable and the default grammar library
    pub fn default_config() -> RunnerConfig {
        RunnerConfig {
            grammar_dir: Some(PathBuf::from(DEFAULT_GRAMMAR_DIR)),
            ..RunnerConfig::for_tool("dharma")
        }
    }

    /// Create a server from `DHARMA_*` settings and prepare its roots.
    ///
    /// The grammar directory is always an authorized root in addition to the
    /// upload and output roots.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = RunnerConfig::from_env(ENV_PREFIX, Self::default_config())?;
        let server = Self::with_config(config);

        tracing::info!("Grammar directory: {}", server.grammar_dir.display());
        tracing::info!("Output directory: {}", server.orchestrator.config().output_dir.display());
        tracing::info!("Max concurrent: {}", server.orchestrator.config().max_concurrent);

        server.orchestrator.prepare_roots()?;
        std::fs::create_dir_all(&server.grammar_dir)?;
        Ok(server)
    }

    /// Create a server with explicit config, falling back to the default
    /// grammar library when none is set
    pub fn with_config(mut config: RunnerConfig) -> Self {
        let grammar_dir = config
            .grammar_dir
            .get_or_insert_with(|| PathBuf::from(DEFAULT_GRAMMAR_DIR))
            .clone();

        Self {
            orchestrator: RunOrchestrator::new(config),
            grammar_dir,
            tool_router: Self::tool_router(),
        }
    }

    pub fn orchestrator(&self) -> &RunOrchestrator {
        &self.orchestrator
    }

    pub fn grammar_dir(&self) -> &Path {
        &self.grammar_dir
    }

    #[tool(
        description = "Generate test cases using a Dharma grammar file",
        input_schema = schema_for_type::<GenerateParams>()
    )]
    async fn dharma_generate(&self, arguments: JsonObject) -> Result<CallToolResult, McpError> {
        Ok(match parse_arguments::<GenerateParams>(arguments) {
            Ok(params) => handlers::generate(&self.orchestrator, &self.grammar_dir, params).await,
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
        description = "List finished Dharma runs (most recent first)",
        input_schema = schema_for_type::<ListRunsParams>()
    )]
    async fn list_runs(&self, arguments: JsonObject) -> Result<CallToolResult, McpError> {
        Ok(match parse_arguments::<ListRunsParams>(arguments) {
            Ok(params) => runs::list_runs(&self.orchestrator, params.status.as_deref(), params.limit),
            Err(result) => result,
        })
    }

    #[tool(description = "List currently running Dharma jobs")]
    async fn list_active_runs(&self) -> Result<CallToolResult, McpError> {
        Ok(runs::list_active_runs(&self.orchestrator))
    }
}

// ============================================================================
// Run Resources
// ============================================================================

impl DharmaMcpServer {
    pub fn run_resources(&self) -> Vec<Resource> {
        RESOURCES.list(&self.orchestrator)
    }

    pub async fn read_run_resource(&self, uri: &str) -> String {
        RESOURCES.read(&self.orchestrator, uri).await
    }
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

#[tool_handler]
impl rmcp::ServerHandler for DharmaMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Dharma grammar-based fuzzer. Grammar paths may be absolute or \
                 relative to the grammar directory. Generated test cases are \
                 returned as the run's stdout."
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
impl EmbeddableMcp for DharmaMcpServer {
    fn server_name(&self) -> &str {
        "dharma"
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
            "dharma_generate" => self.dharma_generate(arguments).await.map_err(Into::into),

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
