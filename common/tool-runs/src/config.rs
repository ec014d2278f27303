//! Runner configuration
//!
//! A [`RunnerConfig`] is built once at startup and shared read-only (behind an
//! `Arc`) by every component. Values come from three layers:
//!
//! 1. Built-in defaults for the wrapped tool ([`RunnerConfig::for_tool`])
//! 2. An optional TOML file named by `<PREFIX>CONFIG_PATH`
//! 3. Environment variables `<PREFIX><FIELD>`, which always win
//!
//! For example with prefix `DAML_VIEWER_`: `DAML_VIEWER_OUTPUT_DIR`,
//! `DAML_VIEWER_MAX_CONCURRENT`, `DAML_VIEWER_ALLOW_ANY_PATH=1`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::ConfigError;
use crate::path_policy::expand_home;

// ============================================================================
// Defaults
// ============================================================================

const DEFAULT_OUTPUT_DIR: &str = "/app/output";
const DEFAULT_UPLOAD_DIR: &str = "/app/uploads";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_CONCURRENT: usize = 3;
const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB
const DEFAULT_MAX_TEXT_OUTPUT: usize = 20_000;
const DEFAULT_MAX_TABLE_PREVIEW: usize = 20_000;

// ============================================================================
// Configuration Types
// ============================================================================

/// Immutable settings for one tool-wrapping server
#[derive(Debug, Clone, Serialize)]
pub struct RunnerConfig {
    /// Root for run scratch directories and default outputs
    pub output_dir: PathBuf,
    /// Root for user-supplied inputs
    pub upload_dir: PathBuf,
    /// Library of tool inputs addressed by relative path (dharma grammars).
    /// Always an authorized root when set.
    pub grammar_dir: Option<PathBuf>,
    /// Additional authorized roots
    pub extra_roots: Vec<PathBuf>,
    /// Timeout applied when a request does not specify one, in seconds
    pub default_timeout: u64,
    /// Maximum number of simultaneously running subprocesses
    pub max_concurrent: usize,
    /// Maximum size of an input file in bytes
    pub max_file_size: u64,
    /// Disable root restrictions entirely
    pub allow_any_path: bool,
    /// Path or name of the wrapped executable
    pub bin: String,
    /// Per-stream character limit for captured stdout/stderr
    pub max_text_output: usize,
    /// Character limit for output file previews
    pub max_table_preview: usize,
}

/// Partial configuration, as read from a TOML file or the environment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub output_dir: Option<String>,
    pub upload_dir: Option<String>,
    pub grammar_dir: Option<String>,
    pub extra_roots: Option<Vec<String>>,
    pub default_timeout: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub max_file_size: Option<u64>,
    pub allow_any_path: Option<bool>,
    pub bin: Option<String>,
    pub max_text_output: Option<usize>,
    pub max_table_preview: Option<usize>,
}

impl RunnerConfig {
    /// Built-in defaults for a tool whose executable is `bin`
    pub fn for_tool(bin: impl Into<String>) -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            grammar_dir: None,
            extra_roots: Vec::new(),
            default_timeout: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allow_any_path: false,
            bin: bin.into(),
            max_text_output: DEFAULT_MAX_TEXT_OUTPUT,
            max_table_preview: DEFAULT_MAX_TABLE_PREVIEW,
        }
    }

    /// Defaults for tests and embedding: everything rooted under `root`
    pub fn rooted_at(root: &Path, bin: impl Into<String>) -> Self {
        Self {
            output_dir: root.join("output"),
            upload_dir: root.join("uploads"),
            ..Self::for_tool(bin)
        }
    }

    /// Load configuration from the process environment
    pub fn from_env(prefix: &str, defaults: RunnerConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, defaults, |key| std::env::var(key).ok())
    }

    /// Load configuration using an arbitrary variable lookup
    pub fn from_lookup<F>(prefix: &str, defaults: RunnerConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = defaults;

        let config_var = format!("{}CONFIG_PATH", prefix);
        if let Some(path) = lookup(&config_var) {
            let overrides = load_overrides_file(Path::new(&path))?;
            tracing::info!("Loaded config from {}={}", config_var, path);
            config.apply(overrides);
        }

        let env_overrides = overrides_from_lookup(prefix, &lookup)?;
        config.apply(env_overrides);

        Ok(config)
    }

    /// Layer a set of overrides on top of this config
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.output_dir {
            self.output_dir = expand_home(&dir);
        }
        if let Some(dir) = overrides.upload_dir {
            self.upload_dir = expand_home(&dir);
        }
        if let Some(dir) = overrides.grammar_dir {
            self.grammar_dir = Some(expand_home(&dir));
        }
        if let Some(roots) = overrides.extra_roots {
            self.extra_roots = roots.iter().map(|r| expand_home(r)).collect();
        }
        if let Some(secs) = overrides.default_timeout {
            self.default_timeout = secs;
        }
        if let Some(n) = overrides.max_concurrent {
            self.max_concurrent = n;
        }
        if let Some(bytes) = overrides.max_file_size {
            self.max_file_size = bytes;
        }
        if let Some(allow) = overrides.allow_any_path {
            self.allow_any_path = allow;
        }
        if let Some(bin) = overrides.bin {
            self.bin = bin;
        }
        if let Some(chars) = overrides.max_text_output {
            self.max_text_output = chars;
        }
        if let Some(chars) = overrides.max_table_preview {
            self.max_table_preview = chars;
        }
    }

    /// The timeout to use for a request; absent or zero means the default
    pub fn timeout_for(&self, requested: Option<u64>) -> u64 {
        match requested {
            Some(secs) if secs > 0 => secs,
            _ => self.default_timeout,
        }
    }

    /// All authorized roots, in the order they are reported to users
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.upload_dir.clone(), self.output_dir.clone()];
        roots.extend(self.grammar_dir.iter().cloned());
        for root in &self.extra_roots {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
        }
        roots
    }
}

// ============================================================================
// Loading Helpers
// ============================================================================

fn load_overrides_file(path: &Path) -> Result<ConfigOverrides, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let overrides: ConfigOverrides =
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    if let Some(n) = overrides.max_concurrent {
        check_max_concurrent(&format!("max_concurrent in {}", path.display()), n)?;
    }
    Ok(overrides)
}

fn overrides_from_lookup<F>(prefix: &str, lookup: &F) -> Result<ConfigOverrides, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |field: &str| -> Option<(String, String)> {
        let var = format!("{}{}", prefix, field);
        lookup(&var).map(|value| (var, value))
    };

    Ok(ConfigOverrides {
        output_dir: get("OUTPUT_DIR").map(|(_, v)| v),
        upload_dir: get("UPLOAD_DIR").map(|(_, v)| v),
        grammar_dir: get("GRAMMAR_DIR").map(|(_, v)| v),
        extra_roots: None,
        default_timeout: get("TIMEOUT").map(|(k, v)| parse_number(&k, &v)).transpose()?,
        max_concurrent: get("MAX_CONCURRENT")
            .map(|(k, v)| parse_number(&k, &v).and_then(|n| check_max_concurrent(&k, n)))
            .transpose()?,
        max_file_size: get("MAX_FILE_SIZE")
            .map(|(k, v)| parse_number(&k, &v))
            .transpose()?,
        allow_any_path: get("ALLOW_ANY_PATH")
            .map(|(k, v)| parse_bool(&k, &v))
            .transpose()?,
        bin: get("BIN").map(|(_, v)| v),
        max_text_output: get("MAX_TEXT_OUTPUT")
            .map(|(k, v)| parse_number(&k, &v))
            .transpose()?,
        max_table_preview: get("MAX_TABLE_PREVIEW")
            .map(|(k, v)| parse_number(&k, &v))
            .transpose()?,
    })
}

fn parse_number<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// The run bound backs a semaphore, which cannot hold more than
/// `Semaphore::MAX_PERMITS` permits
fn check_max_concurrent(var: &str, n: usize) -> Result<usize, ConfigError> {
    if n > Semaphore::MAX_PERMITS {
        return Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: n.to_string(),
            reason: format!("at most {} concurrent runs are supported", Semaphore::MAX_PERMITS),
        });
    }
    Ok(n)
}

/// Parse a boolean environment value (`1/true/yes/on`, `0/false/no/off`)
pub fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
