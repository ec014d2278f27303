//! Run orchestration core shared by the CLI-wrapping MCP servers
//!
//! Each server wraps one external executable. This crate supplies everything
//! between the MCP tool handler and the subprocess:
//!
//! - [`PathPolicy`] - root-bounded path validation with symlink resolution
//! - [`RunStore`] - in-memory registry of [`RunRecord`]s
//! - [`ProcessExecutor`] - subprocess launch with captured output and timeout
//! - [`RunOrchestrator`] - admission control, run lifecycle, summaries
//!
//! # Example
//!
//! ```rust,ignore
//! use tool_runs::{PathKind, RunOrchestrator, RunRequest, RunnerConfig};
//!
//! let orchestrator = RunOrchestrator::new(RunnerConfig::for_tool("daml-viewer"));
//! let input = orchestrator.paths().validate_existing("model.daml", PathKind::Any)?;
//! let run_dir = orchestrator.prepare_run_dir("table")?;
//! let record = orchestrator.start(RunRequest { /* ... */ }).await?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod path_policy;
pub mod record;
pub mod store;
pub mod summary;
pub mod text;

pub use config::{ConfigOverrides, RunnerConfig};
pub use error::{ConfigError, ExecError, RunError, RunResult};
pub use executor::{ExecOutput, ProcessExecutor};
pub use orchestrator::{RunOrchestrator, RunRequest};
pub use path_policy::{PathKind, PathPolicy};
pub use record::{RunFlags, RunRecord, RunStatus};
pub use store::{ListQuery, RunStore, DEFAULT_LIST_LIMIT};
pub use summary::{ActiveRun, ActiveRunList, RunList, RunSummary, SummaryOptions};
pub use text::{truncate, TRUNCATION_MARKER};
