//! Tool handlers for Dharma

use std::path::{Path, PathBuf};

use mcp_common::{summary_result, CallToolResult};
use serde_json::Value;
use tool_runs::path_policy::{expand_home, resolve_path};
use tool_runs::{
    PathKind, RunError, RunFlags, RunOrchestrator, RunRequest, RunResult, RunSummary,
    SummaryOptions,
};

use crate::params::*;

/// Prefix for per-run scratch directories
pub const SCRATCH_PREFIX: &str = "dharma";

/// Build the dharma argv
pub fn build_command(bin: &str, grammar: &Path, count: u32, seed: Option<u64>) -> Vec<String> {
    let mut command = vec![
        bin.to_string(),
        "-grammars".to_string(),
        grammar.display().to_string(),
        "-count".to_string(),
        count.to_string(),
    ];
    if let Some(seed) = seed {
        command.push("-seed".to_string());
        command.push(seed.to_string());
    }
    command
}

/// Find a grammar file: the path as given, else relative to `grammar_dir`.
///
/// Whichever candidate exists is then validated like any other input.
pub fn locate_grammar(
    orchestrator: &RunOrchestrator,
    grammar_dir: &Path,
    grammar_path: &str,
) -> RunResult<PathBuf> {
    let literal = resolve_path(grammar_path)?;
    let fallback = grammar_dir.join(expand_home(grammar_path));

    let candidate = if literal.exists() {
        literal
    } else if fallback.exists() {
        fallback
    } else {
        return Err(RunError::NotFound(format!(
            "Grammar file not found: {}",
            grammar_path
        )));
    };

    orchestrator
        .paths()
        .validate_existing(&candidate.to_string_lossy(), PathKind::File)
}

async fn run_generate(
    orchestrator: &RunOrchestrator,
    grammar_dir: &Path,
    params: GenerateParams,
) -> RunResult<RunSummary> {
    let grammar = locate_grammar(orchestrator, grammar_dir, &params.grammar_path)?;
    let count = params.count.max(1);

    let run_dir = orchestrator.prepare_run_dir(SCRATCH_PREFIX)?;
    let command = build_command(&orchestrator.config().bin, &grammar, count, params.seed);

    let mut flags = RunFlags::new();
    flags.insert("count".to_string(), Value::from(count));
    if let Some(seed) = params.seed {
        flags.insert("seed".to_string(), Value::from(seed));
    }

    let request = RunRequest {
        command,
        input_path: grammar,
        output_path: run_dir.clone(),
        flags,
        timeout_secs: params.timeout,
        cwd: run_dir.clone(),
    };

    let record = match orchestrator.start(request).await {
        Ok(record) => record,
        Err(e) => {
            if let Err(rm) = std::fs::remove_dir(&run_dir) {
                tracing::debug!("could not remove {}: {}", run_dir.display(), rm);
            }
            return Err(e);
        }
    };

    let options = SummaryOptions {
        include_stdout: params.include_stdout,
        include_stderr: params.include_stderr,
        include_table_preview: false,
    };
    Ok(orchestrator.summarize(&record, options).await)
}

pub async fn generate(
    orchestrator: &RunOrchestrator,
    grammar_dir: &Path,
    params: GenerateParams,
) -> CallToolResult {
    summary_result(run_generate(orchestrator, grammar_dir, params).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tool_runs::RunnerConfig;

    #[test]
    fn test_build_command() {
        let cmd = build_command("dharma", Path::new("/app/grammars/url.dg"), 5, None);
        assert_eq!(
            cmd,
            vec!["dharma", "-grammars", "/app/grammars/url.dg", "-count", "5"]
        );

        let seeded = build_command("dharma", Path::new("/g.dg"), 1, Some(42));
        assert_eq!(&seeded[5..], &["-seed", "42"]);
    }

    fn fixture() -> (tempfile::TempDir, PathBuf, RunOrchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let grammars = root.join("grammars");
        std::fs::create_dir_all(grammars.join("web")).unwrap();
        std::fs::write(grammars.join("web").join("url.dg"), "%section% := value\n").unwrap();

        let mut config = RunnerConfig::rooted_at(&root, "dharma");
        config.grammar_dir = Some(grammars.clone());
        (dir, grammars, RunOrchestrator::new(config))
    }

    #[test]
    fn test_locate_grammar_absolute() {
        let (_dir, grammars, orch) = fixture();
        let path = grammars.join("web").join("url.dg");

        let found = locate_grammar(&orch, &grammars, path.to_str().unwrap()).unwrap();
        assert_eq!(found, path);
    }

    #[test]
    fn test_locate_grammar_relative_to_library() {
        let (_dir, grammars, orch) = fixture();

        let found = locate_grammar(&orch, &grammars, "web/url.dg").unwrap();
        assert_eq!(found, grammars.join("web").join("url.dg"));
    }

    #[test]
    fn test_locate_grammar_missing() {
        let (_dir, grammars, orch) = fixture();

        let err = locate_grammar(&orch, &grammars, "web/nope.dg").unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.to_string(), "Grammar file not found: web/nope.dg");
    }

    #[test]
    fn test_locate_grammar_directory_is_wrong_type() {
        let (_dir, grammars, orch) = fixture();

        let err = locate_grammar(&orch, &grammars, "web").unwrap_err();
        assert_eq!(err.kind(), "wrong_type");
    }
}
