//! Tool handlers for daml-viewer
//!
//! Inputs are validated through the orchestrator's path policy and failures
//! are reported in-band, as `{"error": kind, "message": text}`. The run query
//! tools live in `mcp_common::runs`.

use std::path::{Path, PathBuf};

use mcp_common::{summary_result, CallToolResult};
use serde_json::Value;
use tool_runs::{
    PathKind, RunFlags, RunOrchestrator, RunRequest, RunResult, RunSummary, SummaryOptions,
};

use crate::params::*;

/// File name used when no output path is given
pub const DEFAULT_OUTPUT_NAME: &str = "daml_table.md";

/// Prefix for per-run scratch directories
pub const SCRATCH_PREFIX: &str = "table";

// ============================================================================
// Helper Functions
// ============================================================================

/// Build the daml-viewer argv
pub fn build_command(bin: &str, input: &Path, output: &Path, cleared: bool) -> Vec<String> {
    let mut command = vec![
        bin.to_string(),
        input.display().to_string(),
        "--output".to_string(),
        output.display().to_string(),
    ];
    if cleared {
        command.push("--cleared".to_string());
    }
    command
}

/// Remove a scratch directory that never hosted a run
fn discard_run_dir(run_dir: &Path) {
    if let Err(e) = std::fs::remove_dir(run_dir) {
        tracing::debug!("could not remove {}: {}", run_dir.display(), e);
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn run_generate_table(
    orchestrator: &RunOrchestrator,
    params: GenerateTableParams,
) -> RunResult<RunSummary> {
    let input = orchestrator
        .paths()
        .validate_existing(&params.path, PathKind::Any)?;

    let run_dir: PathBuf = orchestrator.prepare_run_dir(SCRATCH_PREFIX)?;

    let output = match orchestrator.paths().validate_output(
        params.output.as_deref(),
        &run_dir,
        DEFAULT_OUTPUT_NAME,
    ) {
        Ok(output) => output,
        Err(e) => {
            discard_run_dir(&run_dir);
            return Err(e);
        }
    };

    let command = build_command(&orchestrator.config().bin, &input, &output, params.cleared);

    let mut flags = RunFlags::new();
    flags.insert("cleared".to_string(), Value::Bool(params.cleared));

    let request = RunRequest {
        command,
        input_path: input,
        output_path: output,
        flags,
        timeout_secs: params.timeout,
        cwd: run_dir.clone(),
    };

    let record = match orchestrator.start(request).await {
        Ok(record) => record,
        Err(e) => {
            discard_run_dir(&run_dir);
            return Err(e);
        }
    };

    let options = SummaryOptions {
        include_stdout: params.include_stdout,
        include_stderr: params.include_stderr,
        include_table_preview: params.include_table_preview,
    };
    Ok(orchestrator.summarize(&record, options).await)
}

pub async fn generate_table(
    orchestrator: &RunOrchestrator,
    params: GenerateTableParams,
) -> CallToolResult {
    summary_result(run_generate_table(orchestrator, params).await)
}
