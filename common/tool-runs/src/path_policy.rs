//! Path policy - resolution and authorization of user-supplied paths
//!
//! Every path a tool receives is resolved to an absolute, symlink-free form
//! and checked against the configured roots before anything is executed.
//! Resolution does not require the path to exist, so not-yet-created output
//! files can be authorized through their parent directory.

use std::path::{Component, Path, PathBuf};

use crate::config::RunnerConfig;
use crate::error::{RunError, RunResult};

/// What kind of filesystem entry an input path must be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Any,
}

/// Root-scoped path authorization
#[derive(Debug, Clone)]
pub struct PathPolicy {
    roots: Vec<PathBuf>,
    allow_any: bool,
    max_file_size: u64,
}

impl PathPolicy {
    /// Build a policy from the runner configuration
    pub fn new(config: &RunnerConfig) -> Self {
        Self::with_roots(config.roots(), config.allow_any_path, config.max_file_size)
    }

    pub fn with_roots(roots: Vec<PathBuf>, allow_any: bool, max_file_size: u64) -> Self {
        Self {
            roots,
            allow_any,
            max_file_size,
        }
    }

    /// Configured roots, as given
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Check whether an already-resolved path is inside an allowed root.
    ///
    /// Roots are resolved on every check so that roots created after startup,
    /// or reached through symlinks, compare against their real location.
    pub fn is_allowed(&self, path: &Path) -> bool {
        if self.allow_any {
            return true;
        }

        self.roots
            .iter()
            .map(|root| resolve(root))
            .any(|root| path.starts_with(&root))
    }

    /// Resolve an input path that must already exist.
    ///
    /// Checks, in order: authorization, existence, entry type, and (for files)
    /// the configured size limit.
    pub fn validate_existing(&self, path: &str, kind: PathKind) -> RunResult<PathBuf> {
        let resolved = resolve_path(path)?;

        if !self.is_allowed(&resolved) {
            return Err(RunError::PathNotAllowed(format!(
                "Path not allowed: {}. Allowed roots: {}. \
                 Enable allow_any_path to disable this restriction.",
                resolved.display(),
                self.roots_display()
            )));
        }

        let metadata = match std::fs::metadata(&resolved) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RunError::NotFound(format!(
                    "Path not found: {}",
                    resolved.display()
                )));
            }
            Err(e) => {
                return Err(RunError::Internal(format!(
                    "Cannot stat {}: {}",
                    resolved.display(),
                    e
                )));
            }
        };

        match kind {
            PathKind::Directory if !metadata.is_dir() => {
                return Err(RunError::WrongType(format!(
                    "Expected a directory, got file: {}",
                    resolved.display()
                )));
            }
            PathKind::File if !metadata.is_file() => {
                return Err(RunError::WrongType(format!(
                    "Expected a file, got directory: {}",
                    resolved.display()
                )));
            }
            _ => {}
        }

        if metadata.is_file() && metadata.len() > self.max_file_size {
            return Err(RunError::TooLarge {
                size: metadata.len(),
                max: self.max_file_size,
            });
        }

        Ok(resolved)
    }

    /// Decide where a run writes its output.
    ///
    /// - no path: `<run_dir>/<default_name>`
    /// - an existing directory: `<dir>/<default_name>`
    /// - anything else: the literal path, authorized through its parent
    pub fn validate_output(
        &self,
        path: Option<&str>,
        run_dir: &Path,
        default_name: &str,
    ) -> RunResult<PathBuf> {
        let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
            return Ok(run_dir.join(default_name));
        };

        let resolved = resolve_path(path)?;

        if resolved.is_dir() {
            if !self.is_allowed(&resolved) {
                return Err(self.output_not_allowed(&resolved));
            }
            return Ok(resolved.join(default_name));
        }

        let parent = resolved.parent().unwrap_or(resolved.as_path());
        if !self.is_allowed(parent) {
            return Err(self.output_not_allowed(&resolved));
        }

        Ok(resolved)
    }

    fn output_not_allowed(&self, path: &Path) -> RunError {
        RunError::PathNotAllowed(format!(
            "Output path not allowed: {}. Allowed roots: {}.",
            path.display(),
            self.roots_display()
        ))
    }

    fn roots_display(&self) -> String {
        self.roots
            .iter()
            .map(|r| r.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Resolution Helpers
// ============================================================================

/// Expand `~` and `~/...` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve a user-supplied path string to an absolute, symlink-resolved path.
///
/// The path does not need to exist.
pub fn resolve_path(path: &str) -> RunResult<PathBuf> {
    if path.contains('\0') {
        return Err(RunError::PathNotAllowed(
            "Path contains null byte".to_string(),
        ));
    }

    Ok(resolve(&expand_home(path)))
}

/// Resolve an already-expanded path; relative paths are taken from the
/// current working directory.
pub fn resolve(path: &Path) -> PathBuf {
    resolve_lenient(&absolutize(path))
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Walk the components, canonicalizing each prefix that exists and falling
/// back to lexical joins for the parts that do not. `..` always pops the
/// already-resolved prefix, so it follows the real parent of a symlink target.
fn resolve_lenient(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                let candidate = resolved.join(name);
                resolved = candidate.canonicalize().unwrap_or(candidate);
            }
        }
    }

    resolved
}
