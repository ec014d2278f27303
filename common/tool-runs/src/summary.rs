//! Response shapes for run queries

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::{RunFlags, RunRecord, RunStatus};

/// Which optional sections to include in a [`RunSummary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryOptions {
    pub include_stdout: bool,
    pub include_stderr: bool,
    pub include_table_preview: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            include_stdout: false,
            include_stderr: false,
            include_table_preview: true,
        }
    }
}

impl SummaryOptions {
    /// Identity and outcome only, as used by run listings
    pub fn brief() -> Self {
        Self {
            include_stdout: false,
            include_stderr: false,
            include_table_preview: false,
        }
    }

    /// Everything, as used by resource reads
    pub fn full() -> Self {
        Self {
            include_stdout: true,
            include_stderr: true,
            include_table_preview: true,
        }
    }
}

/// Structured view of a run returned by every tool
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub command: Vec<String>,
    pub input_path: String,
    pub output_path: String,
    pub flags: RunFlags,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_preview: Option<String>,
}

impl RunSummary {
    /// Summary without the output-file preview
    pub fn from_record(record: &RunRecord, options: SummaryOptions) -> Self {
        Self {
            run_id: record.run_id.clone(),
            status: record.status,
            command: record.command.clone(),
            input_path: record.input_path.display().to_string(),
            output_path: record.output_path.display().to_string(),
            flags: record.flags.clone(),
            started_at: record.started_at,
            completed_at: record.completed_at,
            error: record.error.clone(),
            stdout: options
                .include_stdout
                .then(|| record.stdout.clone())
                .flatten(),
            stderr: options
                .include_stderr
                .then(|| record.stderr.clone())
                .flatten(),
            table_preview: None,
        }
    }
}

/// Response for `list_runs`
#[derive(Debug, Clone, Serialize)]
pub struct RunList {
    pub runs: Vec<RunSummary>,
    pub count: usize,
}

/// One in-flight run, as reported by `list_active_runs`
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: Vec<String>,
    pub input_path: String,
}

/// Response for `list_active_runs`
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRunList {
    pub active_runs: Vec<ActiveRun>,
    pub count: usize,
    pub max_concurrent: usize,
}
