//! Error types for the run orchestration core
//!
//! [`RunError`] is the user-facing taxonomy: every variant maps to a stable
//! `kind()` code that servers put in their structured error payloads.
//! [`ExecError`] is the narrower result of a single subprocess execution and
//! [`ConfigError`] covers startup configuration problems.

use std::time::Duration;

use thiserror::Error;

// ============================================================================
// Run Errors
// ============================================================================

/// Errors surfaced to callers of a tool or run query
#[derive(Error, Debug)]
pub enum RunError {
    /// The resolved path is outside every configured root
    #[error("{0}")]
    PathNotAllowed(String),

    /// An input path (or a run id) does not exist
    #[error("{0}")]
    NotFound(String),

    /// The path exists but is a file where a directory was required, or vice versa
    #[error("{0}")]
    WrongType(String),

    /// An input file exceeds the configured size limit
    #[error("File too large ({size} bytes). Max: {max} bytes.")]
    TooLarge { size: u64, max: u64 },

    /// The active run set is full
    #[error("Maximum concurrent runs ({0}) reached.")]
    ConcurrencyLimitExceeded(usize),

    /// The wrapped executable could not be launched
    #[error("{0}")]
    Spawn(String),

    /// The subprocess exceeded its timeout
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Anything else
    #[error("{0}")]
    Internal(String),
}

impl RunError {
    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::PathNotAllowed(_) => "path_not_allowed",
            RunError::NotFound(_) => "not_found",
            RunError::WrongType(_) => "wrong_type",
            RunError::TooLarge { .. } => "too_large",
            RunError::ConcurrencyLimitExceeded(_) => "concurrency_limit_exceeded",
            RunError::Spawn(_) => "spawn_error",
            RunError::Timeout(_) => "timeout",
            RunError::Internal(_) => "internal_error",
        }
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        RunError::Internal(format!("IO error: {}", err))
    }
}

impl From<ExecError> for RunError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::Spawn(msg) => RunError::Spawn(msg),
            ExecError::Timeout(limit) => RunError::Timeout(limit.as_secs()),
            ExecError::Io(e) => RunError::Internal(e.to_string()),
        }
    }
}

pub type RunResult<T> = Result<T, RunError>;

// ============================================================================
// Executor Errors
// ============================================================================

/// Failure modes of a single subprocess execution.
///
/// A non-zero exit code is not an error at this level.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to launch process: {0}")]
    Spawn(String),

    #[error("process timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("IO error while collecting process output: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Config Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
