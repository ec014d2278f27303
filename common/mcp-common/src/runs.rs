//! Run tools shared by every tool-wrapping server
//!
//! `get_run_results`, `list_runs` and `list_active_runs` behave the same on
//! every server, and finished runs are published as resources under a
//! per-server URI prefix. Servers only supply the generate tool.

use rmcp::model::{AnnotateAble, CallToolResult, RawResource, Resource};
use serde_json::json;
use tool_runs::{RunError, RunOrchestrator, RunResult, RunSummary, SummaryOptions};

use crate::result::{error_result, in_band, json_success};

/// Report a run error in-band
pub fn run_failure(err: RunError) -> CallToolResult {
    match &err {
        RunError::Internal(_) => tracing::error!(kind = err.kind(), "{}", err),
        _ => tracing::warn!(kind = err.kind(), "{}", err),
    }
    error_result(err.kind(), err.to_string())
}

/// A run summary, or the error that prevented one
pub fn summary_result(result: RunResult<RunSummary>) -> CallToolResult {
    match result {
        Ok(summary) => in_band(json_success(&summary)),
        Err(err) => run_failure(err),
    }
}

pub async fn get_run_results(
    orchestrator: &RunOrchestrator,
    run_id: &str,
    options: SummaryOptions,
) -> CallToolResult {
    summary_result(orchestrator.run_summary(run_id, options).await)
}

/// Finished runs, newest first
pub fn list_runs(
    orchestrator: &RunOrchestrator,
    status: Option<&str>,
    limit: Option<usize>,
) -> CallToolResult {
    in_band(json_success(&orchestrator.list_by_status(status, limit)))
}

pub fn list_active_runs(orchestrator: &RunOrchestrator) -> CallToolResult {
    in_band(json_success(&orchestrator.active_runs()))
}

// ============================================================================
// Run Resources
// ============================================================================

/// Finished runs exposed as `<prefix><run_id>` JSON resources
#[derive(Debug, Clone, Copy)]
pub struct RunResources {
    prefix: &'static str,
    title: &'static str,
}

impl RunResources {
    /// `prefix` is the URI up to the run id (`dharma://runs/`), `title` names
    /// the tool in resource names
    pub const fn new(prefix: &'static str, title: &'static str) -> Self {
        Self { prefix, title }
    }

    pub fn list(&self, orchestrator: &RunOrchestrator) -> Vec<Resource> {
        orchestrator
            .finished_runs()
            .into_iter()
            .map(|run| {
                let mut raw = RawResource::new(
                    format!("{}{}", self.prefix, run.run_id),
                    format!("{} Run ({})", self.title, run.status),
                );
                raw.description = Some(format!("Command: {}", run.command.join(" ")));
                raw.mime_type = Some("application/json".to_string());
                raw.no_annotation()
            })
            .collect()
    }

    /// Full summary for `uri`, or a not-found payload
    pub async fn read(&self, orchestrator: &RunOrchestrator, uri: &str) -> String {
        let summary = match uri.strip_prefix(self.prefix) {
            Some(run_id) => orchestrator
                .run_summary(run_id, SummaryOptions::full())
                .await
                .ok(),
            None => None,
        };

        match summary.map(|s| serde_json::to_string_pretty(&s)) {
            Some(Ok(text)) => text,
            _ => json!({ "error": "Resource not found" }).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tool_runs::RunnerConfig;

    fn orchestrator() -> (tempfile::TempDir, RunOrchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = RunOrchestrator::new(RunnerConfig::rooted_at(dir.path(), "tool"));
        (dir, orchestrator)
    }

    fn body(result: &CallToolResult) -> Value {
        serde_json::from_str(&crate::result_text(result)).unwrap()
    }

    #[test]
    fn test_run_failure_payload() {
        let result = run_failure(RunError::TooLarge { size: 11, max: 10 });
        assert_eq!(result.is_error, Some(true));

        let value = body(&result);
        assert_eq!(value["error"], "too_large");
        assert_eq!(value["message"], "File too large (11 bytes). Max: 10 bytes.");
    }

    #[tokio::test]
    async fn test_unknown_run_is_not_found() {
        let (_dir, orchestrator) = orchestrator();

        let result = get_run_results(&orchestrator, "deadbeef", SummaryOptions::default()).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(body(&result)["error"], "not_found");
    }

    #[test]
    fn test_empty_listings() {
        let (_dir, orchestrator) = orchestrator();

        let runs = body(&list_runs(&orchestrator, None, None));
        assert_eq!(runs["count"], 0);
        assert_eq!(runs["runs"], json!([]));

        let active = body(&list_active_runs(&orchestrator));
        assert_eq!(active["count"], 0);
        assert_eq!(active["max_concurrent"], 3);
    }

    #[tokio::test]
    async fn test_unknown_resource() {
        let (_dir, orchestrator) = orchestrator();
        let resources = RunResources::new("dharma://runs/", "Dharma");

        assert!(resources.list(&orchestrator).is_empty());
        for uri in ["dharma://runs/deadbeef", "damlviewer://runs/deadbeef", "nonsense"] {
            let value: Value = serde_json::from_str(&resources.read(&orchestrator, uri).await).unwrap();
            assert_eq!(value["error"], "Resource not found");
        }
    }
}
