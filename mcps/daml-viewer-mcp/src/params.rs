//! Parameter types for daml-viewer MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateTableParams {
    #[schemars(description = "Path to a DAML project root (directory) or a single .daml file")]
    pub path: String,

    #[schemars(
        description = "Output path for the markdown table. Defaults to a fresh run directory under the output root"
    )]
    #[serde(default)]
    pub output: Option<String>,

    #[schemars(description = "Clear placeholder cells (N/A) and (none) from the table")]
    #[serde(default)]
    pub cleared: bool,

    #[schemars(description = "Timeout in seconds (optional, uses the server default if not provided)")]
    #[serde(default)]
    pub timeout: Option<u64>,

    #[schemars(description = "Include captured stdout in the response")]
    #[serde(default)]
    pub include_stdout: bool,

    #[schemars(description = "Include captured stderr in the response")]
    #[serde(default)]
    pub include_stderr: bool,

    #[schemars(description = "Include a preview of the generated table")]
    #[serde(default = "default_true")]
    pub include_table_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetRunResultsParams {
    #[schemars(description = "Run ID returned by a previous tool call")]
    pub run_id: String,

    #[serde(default)]
    pub include_stdout: bool,

    #[serde(default)]
    pub include_stderr: bool,

    #[serde(default = "default_true")]
    pub include_table_preview: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListRunsParams {
    #[schemars(description = "Filter by status (completed|failed|timeout|error)")]
    #[serde(default)]
    pub status: Option<String>,

    #[schemars(description = "Maximum number of runs to return (default: 50)")]
    #[serde(default)]
    pub limit: Option<usize>,
}
