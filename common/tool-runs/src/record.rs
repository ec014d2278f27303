//! Run records and their lifecycle states

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tool-specific options captured for reproducibility
pub type RunFlags = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Run Status
// ============================================================================

/// Lifecycle state of a run.
///
/// `Running` is the only non-terminal state; a run leaves it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Timeout,
    Error,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Timeout => write!(f, "timeout"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            "timeout" => Ok(RunStatus::Timeout),
            "error" => Ok(RunStatus::Error),
            other => Err(format!(
                "Unknown run status: {} (expected completed|failed|timeout|error)",
                other
            )),
        }
    }
}

// ============================================================================
// Run Record
// ============================================================================

/// One execution attempt of a wrapped tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub command: Vec<String>,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub flags: RunFlags,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub error: Option<String>,
}

impl RunRecord {
    pub(crate) fn new(
        run_id: String,
        command: Vec<String>,
        input_path: &Path,
        output_path: &Path,
        flags: RunFlags,
    ) -> Self {
        Self {
            run_id,
            command,
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            flags,
            started_at: Utc::now(),
            completed_at: None,
            status: RunStatus::Running,
            stdout: None,
            stderr: None,
            error: None,
        }
    }

    /// Move the record into a terminal state.
    ///
    /// Has no effect if the record is already terminal.
    pub(crate) fn finish(&mut self, status: RunStatus, error: Option<String>) {
        debug_assert!(status.is_terminal());
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.error = error;
        self.completed_at = Some(Utc::now());
    }
}
