//! Run orchestrator - the only component that starts subprocess-backed runs
//!
//! A run goes through admission (a non-blocking semaphore acquire), record
//! creation, execution on its own task, and finalization. Finalization lives
//! in [`RunGuard`]'s `Drop`, so the active set and the store are updated even
//! when the run task panics or is torn down mid-flight.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info};

use crate::config::RunnerConfig;
use crate::error::{ExecError, RunError, RunResult};
use crate::executor::{ExecOutput, ProcessExecutor};
use crate::path_policy::{resolve, PathPolicy};
use crate::record::{RunFlags, RunRecord, RunStatus};
use crate::store::{short_id, ListQuery, RunStore, DEFAULT_LIST_LIMIT};
use crate::summary::{ActiveRun, ActiveRunList, RunList, RunSummary, SummaryOptions};
use crate::text::{read_preview, truncate};

/// Longest `error` taken from a failed run's stderr, in characters
pub const MAX_ERROR_CHARS: usize = 2000;

/// Message recorded when a run task ends without reporting an outcome
const ABORTED_MESSAGE: &str = "Run aborted before completion";

type ActiveSet = Arc<Mutex<BTreeSet<String>>>;

/// A fully resolved command ready to run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub command: Vec<String>,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub flags: RunFlags,
    /// Requested timeout in seconds; `None` or zero uses the configured default
    pub timeout_secs: Option<u64>,
    /// Working directory for the subprocess
    pub cwd: PathBuf,
}

/// Admission control, run lifecycle, and summaries for one server
#[derive(Clone)]
pub struct RunOrchestrator {
    config: Arc<RunnerConfig>,
    paths: PathPolicy,
    store: RunStore,
    executor: ProcessExecutor,
    permits: Arc<Semaphore>,
    active: ActiveSet,
}

impl RunOrchestrator {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_parts(Arc::new(config), RunStore::new(), ProcessExecutor::new())
    }

    pub fn with_parts(
        config: Arc<RunnerConfig>,
        store: RunStore,
        executor: ProcessExecutor,
    ) -> Self {
        Self {
            paths: PathPolicy::new(&config),
            // Hand-built configs skip the loader's bound check
            permits: Arc::new(Semaphore::new(
                config.max_concurrent.min(Semaphore::MAX_PERMITS),
            )),
            active: Arc::new(Mutex::new(BTreeSet::new())),
            config,
            store,
            executor,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn paths(&self) -> &PathPolicy {
        &self.paths
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// Create the output and upload roots if they do not exist yet
    pub fn prepare_roots(&self) -> RunResult<()> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        std::fs::create_dir_all(&self.config.upload_dir)?;
        Ok(())
    }

    /// Create a fresh scratch directory `<output_dir>/<prefix>_<id>`
    pub fn prepare_run_dir(&self, prefix: &str) -> RunResult<PathBuf> {
        let output_root = resolve(&self.config.output_dir);
        std::fs::create_dir_all(&output_root)?;

        let run_dir = output_root.join(format!("{}_{}", prefix, short_id()));
        std::fs::create_dir_all(&run_dir)?;
        Ok(run_dir)
    }

    /// Admit, execute, and finalize one run.
    ///
    /// Fails without recording anything if the concurrency bound is reached.
    /// Every admitted run returns its terminal record; execution failures are
    /// reported through the record's status, not as errors.
    pub async fn start(&self, request: RunRequest) -> RunResult<RunRecord> {
        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| RunError::ConcurrencyLimitExceeded(self.config.max_concurrent))?;

        let timeout_secs = self.config.timeout_for(request.timeout_secs);
        let record = self.store.create(
            request.command,
            &request.input_path,
            &request.output_path,
            request.flags,
        );
        let run_id = record.run_id.clone();

        info!(
            run_id = %run_id,
            command = %record.command.join(" "),
            timeout_secs,
            "run admitted"
        );

        let guard = RunGuard::admit(record, self.store.clone(), Arc::clone(&self.active), permit);
        let executor = self.executor.clone();
        let max_chars = self.config.max_text_output;
        let cwd = request.cwd;

        let task = tokio::spawn(async move {
            let argv = guard.record.command.clone();
            let outcome = executor
                .execute(&argv, &cwd, Duration::from_secs(timeout_secs))
                .await;
            guard.complete(outcome, timeout_secs, max_chars)
        });

        match task.await {
            Ok(record) => {
                info!(run_id = %run_id, status = %record.status, "run finished");
                Ok(record)
            }
            Err(join_error) => {
                error!(run_id = %run_id, "run task failed: {}", join_error);
                self.store.get(&run_id).ok_or_else(|| {
                    RunError::Internal(format!("Run '{}' lost after task failure", run_id))
                })
            }
        }
    }

    pub fn get(&self, run_id: &str) -> RunResult<RunRecord> {
        self.store
            .get(run_id)
            .ok_or_else(|| RunError::NotFound(format!("Run '{}' not found", run_id)))
    }

    /// Finished runs, newest first, as brief summaries
    pub fn list(&self, query: &ListQuery) -> RunList {
        let runs: Vec<RunSummary> = self
            .store
            .list(query)
            .iter()
            .map(|record| RunSummary::from_record(record, SummaryOptions::brief()))
            .collect();
        RunList {
            count: runs.len(),
            runs,
        }
    }

    /// Finished runs filtered by a status name, as received from a client.
    ///
    /// A status that names no terminal state matches nothing.
    pub fn list_by_status(&self, status: Option<&str>, limit: Option<usize>) -> RunList {
        let status = match status.map(str::parse::<RunStatus>) {
            None => None,
            Some(Ok(status)) => Some(status),
            Some(Err(_)) => {
                return RunList {
                    runs: Vec::new(),
                    count: 0,
                }
            }
        };

        self.list(&ListQuery {
            status,
            limit: limit.unwrap_or(DEFAULT_LIST_LIMIT),
            ..Default::default()
        })
    }

    /// Look up a run and format it
    pub async fn run_summary(&self, run_id: &str, options: SummaryOptions) -> RunResult<RunSummary> {
        let record = self.get(run_id)?;
        Ok(self.summarize(&record, options).await)
    }

    /// Every finished run, oldest first
    pub fn finished_runs(&self) -> Vec<RunRecord> {
        self.store.list(&ListQuery {
            status: None,
            limit: usize::MAX,
            newest_first: false,
        })
    }

    /// Ids of currently executing runs, sorted
    pub fn active_ids(&self) -> Vec<String> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn active_runs(&self) -> ActiveRunList {
        let active_runs: Vec<ActiveRun> = self
            .active_ids()
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(|run| ActiveRun {
                run_id: run.run_id,
                started_at: run.started_at,
                command: run.command,
                input_path: run.input_path.display().to_string(),
            })
            .collect();

        ActiveRunList {
            count: active_runs.len(),
            active_runs,
            max_concurrent: self.config.max_concurrent,
        }
    }

    /// Format a run, reading the output-file preview fresh from disk
    pub async fn summarize(&self, record: &RunRecord, options: SummaryOptions) -> RunSummary {
        let mut summary = RunSummary::from_record(record, options);

        if options.include_table_preview && is_file(&record.output_path).await {
            summary.table_preview =
                Some(read_preview(&record.output_path, self.config.max_table_preview).await);
        }

        summary
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

// ============================================================================
// Run Guard
// ============================================================================

/// Owns an admitted run until it is finalized.
///
/// Dropping the guard removes the run from the active set, persists the
/// record, and then releases the concurrency permit, in that order. A guard
/// dropped without an outcome marks the run as `error`.
struct RunGuard {
    record: RunRecord,
    store: RunStore,
    active: ActiveSet,
    _permit: OwnedSemaphorePermit,
}

impl RunGuard {
    fn admit(
        record: RunRecord,
        store: RunStore,
        active: ActiveSet,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.run_id.clone());

        Self {
            record,
            store,
            active,
            _permit: permit,
        }
    }

    fn complete(
        mut self,
        outcome: Result<ExecOutput, ExecError>,
        timeout_secs: u64,
        max_chars: usize,
    ) -> RunRecord {
        apply_outcome(&mut self.record, outcome, timeout_secs, max_chars);
        self.record.clone()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.record.status.is_terminal() {
            error!(run_id = %self.record.run_id, "run ended without an outcome");
            self.record
                .finish(RunStatus::Error, Some(ABORTED_MESSAGE.to_string()));
        }

        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.record.run_id);

        self.store.update(self.record.clone());
        debug!(run_id = %self.record.run_id, "run finalized");
    }
}

/// Classify an executor outcome into the record's terminal state
fn apply_outcome(
    record: &mut RunRecord,
    outcome: Result<ExecOutput, ExecError>,
    timeout_secs: u64,
    max_chars: usize,
) {
    match outcome {
        Ok(output) => {
            record.stdout = Some(truncate(&output.stdout, max_chars));
            record.stderr = Some(truncate(&output.stderr, max_chars));

            if output.exit_code == 0 {
                record.finish(RunStatus::Completed, None);
            } else {
                let stderr = output.stderr.trim();
                let message = if stderr.is_empty() {
                    format!("Command failed with exit code {}", output.exit_code)
                } else {
                    stderr.chars().take(MAX_ERROR_CHARS).collect()
                };
                record.finish(RunStatus::Failed, Some(message));
            }
        }
        Err(ExecError::Timeout(_)) => {
            record.finish(
                RunStatus::Timeout,
                Some(RunError::Timeout(timeout_secs).to_string()),
            );
        }
        Err(e) => {
            record.finish(RunStatus::Error, Some(e.to_string()));
        }
    }
}
