//! Parameter types for Dharma MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_count() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateParams {
    #[schemars(
        description = "Path to the grammar file (e.g. /app/grammars/json.dg), or a path relative to the grammar directory"
    )]
    pub grammar_path: String,

    #[schemars(description = "Number of test cases to generate (default: 1)")]
    #[serde(default = "default_count")]
    pub count: u32,

    #[schemars(description = "Seed for reproducible generation")]
    #[serde(default)]
    pub seed: Option<u64>,

    #[schemars(description = "Timeout in seconds (optional, uses the server default if not provided)")]
    #[serde(default)]
    pub timeout: Option<u64>,

    #[schemars(description = "Include the generated test cases (stdout) in the response")]
    #[serde(default = "default_true")]
    pub include_stdout: bool,

    #[schemars(description = "Include captured stderr in the response")]
    #[serde(default)]
    pub include_stderr: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetRunResultsParams {
    #[schemars(description = "Run ID returned by a previous dharma_generate call")]
    pub run_id: String,

    #[schemars(description = "Include the generated test cases")]
    #[serde(default)]
    pub include_stdout: bool,

    #[serde(default)]
    pub include_stderr: bool,

    #[schemars(description = "Include a preview of the output path when it is a file")]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let params: GenerateParams =
            serde_json::from_value(serde_json::json!({ "grammar_path": "url.dg" })).unwrap();

        assert_eq!(params.count, 1);
        assert!(params.seed.is_none());
        assert!(params.include_stdout);
        assert!(!params.include_stderr);
    }

    #[test]
    fn test_negative_count_rejected() {
        let parsed = serde_json::from_value::<GenerateParams>(
            serde_json::json!({ "grammar_path": "url.dg", "count": -1 }),
        );
        assert!(parsed.is_err());
    }
}
