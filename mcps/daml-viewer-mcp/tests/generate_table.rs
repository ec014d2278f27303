//! End-to-end tests for the daml-viewer MCP server
//!
//! The server is driven in-process through `EmbeddableMcp`, with small shell
//! scripts standing in for the real `daml-viewer` binary.

#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use daml_viewer_mcp::DamlViewerMcpServer;
use mcp_common::{result_text, EmbeddableMcp};
use serde_json::{json, Value};
use tempfile::TempDir;
use tool_runs::RunnerConfig;

const TABLE: &str = "| Template | Choice | Controllers |\n|---|---|---|\n| Iou | Transfer | owner |\n";

// ============================================================================
// Fake Tools
// ============================================================================

struct FakeTools {
    ok: PathBuf,
    fail: PathBuf,
    slow: PathBuf,
    hang: PathBuf,
}

/// Scripts are written once, before any test spawns a process
fn tools() -> &'static FakeTools {
    static TOOLS: OnceLock<FakeTools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("daml-viewer-fakes-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        FakeTools {
            ok: script(
                &dir,
                "ok.sh",
                &format!(
                    "printf '{}' > \"$3\"\nif [ \"$4\" = \"--cleared\" ]; then echo cleared; fi\necho \"wrote $3\"\n",
                    TABLE.replace('\n', "\\n")
                ),
            ),
            fail: script(&dir, "fail.sh", "echo boom >&2\nexit 1\n"),
            slow: script(&dir, "slow.sh", "sleep 2\nprintf 'slow\\n' > \"$3\"\n"),
            hang: script(&dir, "hang.sh", "exec sleep 30\n"),
        }
    })
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "#!/bin/sh\n{}", body).unwrap();
    file.sync_all().unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

// ============================================================================
// Sandbox
// ============================================================================

struct Sandbox {
    _dir: TempDir,
    root: PathBuf,
    server: DamlViewerMcpServer,
}

impl Sandbox {
    fn new(bin: &Path) -> Self {
        Self::with(bin, |_| {})
    }

    fn with(bin: &Path, tweak: impl FnOnce(&mut RunnerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();

        let mut config = RunnerConfig::rooted_at(&root, bin.display().to_string());
        config.default_timeout = 20;
        tweak(&mut config);

        let server = DamlViewerMcpServer::with_config(config);
        server.orchestrator().prepare_roots().unwrap();

        Self {
            _dir: dir,
            root,
            server,
        }
    }

    fn upload(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join("uploads").join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn output_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.root.join("output"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    async fn call(&self, tool: &str, args: Value) -> (bool, Value) {
        call(&self.server, tool, args).await
    }
}

async fn call(server: &DamlViewerMcpServer, tool: &str, args: Value) -> (bool, Value) {
    let result = server.call_tool(tool, args).await.unwrap();
    let body = serde_json::from_str(&result_text(&result)).unwrap();
    (result.is_error.unwrap_or(false), body)
}

// ============================================================================
// Generate Table
// ============================================================================

#[tokio::test]
async fn completed_run_writes_default_output_with_preview() {
    let tools = tools();
    let sandbox = Sandbox::new(&tools.ok);
    let input = sandbox.upload("Main.daml", "module Main where\n");

    let (is_error, body) = sandbox
        .call("damlviewer_generate_table", json!({ "path": input }))
        .await;

    assert!(!is_error, "{}", body);
    assert_eq!(body["status"], "completed");
    assert!(body["error"].is_null());
    assert!(!body["completed_at"].is_null());
    assert_eq!(body["flags"]["cleared"], false);
    assert_eq!(body["table_preview"], TABLE);
    assert!(body.get("stdout").is_none());
    assert!(body.get("stderr").is_none());

    let output = PathBuf::from(body["output_path"].as_str().unwrap());
    assert_eq!(output.file_name().unwrap(), "daml_table.md");
    let run_dir = output.parent().unwrap();
    assert_eq!(run_dir.parent().unwrap(), sandbox.root.join("output"));
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("table_"));

    let command: Vec<&str> = body["command"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        command,
        vec![
            tools.ok.to_str().unwrap(),
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]
    );
}

#[tokio::test]
async fn cleared_flag_is_passed_and_recorded() {
    let sandbox = Sandbox::new(&tools().ok);
    let project = sandbox.root.join("uploads").join("project");
    std::fs::create_dir(&project).unwrap();

    let (is_error, body) = sandbox
        .call(
            "damlviewer_generate_table",
            json!({ "path": project, "cleared": true, "include_stdout": true }),
        )
        .await;

    assert!(!is_error, "{}", body);
    assert_eq!(body["flags"]["cleared"], true);
    assert_eq!(body["command"].as_array().unwrap().last().unwrap(), "--cleared");
    assert!(body["stdout"].as_str().unwrap().starts_with("cleared\n"));
}

#[tokio::test]
async fn failing_tool_reports_stderr() {
    let sandbox = Sandbox::new(&tools().fail);
    let input = sandbox.upload("Main.daml", "module Main where\n");

    let (is_error, body) = sandbox
        .call("damlviewer_generate_table", json!({ "path": input }))
        .await;

    assert!(!is_error, "a failed run is still a successful tool call");
    assert_eq!(body["status"], "failed");
    assert_eq!(body["error"], "boom");
    assert!(body.get("table_preview").is_none());

    let (_, fetched) = sandbox
        .call(
            "get_run_results",
            json!({ "run_id": body["run_id"], "include_stderr": true }),
        )
        .await;
    assert_eq!(fetched["stderr"], "boom\n");
}

#[tokio::test]
async fn oversized_input_is_rejected_before_running() {
    let sandbox = Sandbox::with(&tools().ok, |c| c.max_file_size = 10);
    let input = sandbox.upload("Big.daml", "01234567890");

    let (is_error, body) = sandbox
        .call("damlviewer_generate_table", json!({ "path": input }))
        .await;

    assert!(is_error);
    assert_eq!(body["error"], "too_large");
    assert_eq!(body["message"], "File too large (11 bytes). Max: 10 bytes.");
    assert!(sandbox.server.orchestrator().store().is_empty());
    assert!(sandbox.output_entries().is_empty());

    let exact = sandbox.upload("Exact.daml", "0123456789");
    let (is_error, _) = sandbox
        .call("damlviewer_generate_table", json!({ "path": exact }))
        .await;
    assert!(!is_error);
}

#[tokio::test]
async fn input_outside_roots_is_rejected() {
    let sandbox = Sandbox::new(&tools().ok);
    let elsewhere = tempfile::tempdir().unwrap();
    let input = elsewhere.path().join("Main.daml");
    std::fs::write(&input, "module Main where\n").unwrap();

    let (is_error, body) = sandbox
        .call("damlviewer_generate_table", json!({ "path": input }))
        .await;

    assert!(is_error);
    assert_eq!(body["error"], "path_not_allowed");
    assert!(sandbox.server.orchestrator().store().is_empty());
}

#[tokio::test]
async fn missing_input_is_not_found() {
    let sandbox = Sandbox::new(&tools().ok);
    let missing = sandbox.root.join("uploads").join("Nope.daml");

    let (is_error, body) = sandbox
        .call("damlviewer_generate_table", json!({ "path": missing }))
        .await;

    assert!(is_error);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn malformed_arguments_are_reported_in_result() {
    let sandbox = Sandbox::new(&tools().ok);
    let input = sandbox.upload("Main.daml", "module Main where\n");

    let (is_error, body) = sandbox.call("damlviewer_generate_table", json!({})).await;
    assert!(is_error);
    assert_eq!(body["error"], "internal_error");
    assert!(body["message"].as_str().unwrap().contains("path"));

    let (is_error, body) = sandbox
        .call(
            "damlviewer_generate_table",
            json!({ "path": input, "timeout": -5 }),
        )
        .await;
    assert!(is_error);
    assert_eq!(body["error"], "internal_error");

    assert!(sandbox.server.orchestrator().store().is_empty());
    assert!(sandbox.output_entries().is_empty());
}

#[tokio::test]
async fn output_directory_gets_default_name() {
    let sandbox = Sandbox::new(&tools().ok);
    let input = sandbox.upload("Main.daml", "module Main where\n");
    let custom = sandbox.root.join("output").join("custom");
    std::fs::create_dir(&custom).unwrap();

    let (is_error, body) = sandbox
        .call(
            "damlviewer_generate_table",
            json!({ "path": input, "output": custom }),
        )
        .await;

    assert!(!is_error, "{}", body);
    assert_eq!(
        body["output_path"],
        custom.join("daml_table.md").display().to_string()
    );
    assert_eq!(
        std::fs::read_to_string(custom.join("daml_table.md")).unwrap(),
        TABLE
    );
}

#[tokio::test]
async fn output_outside_roots_is_rejected_and_scratch_removed() {
    let sandbox = Sandbox::new(&tools().ok);
    let input = sandbox.upload("Main.daml", "module Main where\n");
    let elsewhere = tempfile::tempdir().unwrap();

    let (is_error, body) = sandbox
        .call(
            "damlviewer_generate_table",
            json!({ "path": input, "output": elsewhere.path().join("table.md") }),
        )
        .await;

    assert!(is_error);
    assert_eq!(body["error"], "path_not_allowed");
    assert!(sandbox.output_entries().is_empty());
    assert!(sandbox.server.orchestrator().store().is_empty());
}

#[tokio::test]
async fn slow_tool_times_out() {
    let sandbox = Sandbox::new(&tools().hang);
    let input = sandbox.upload("Main.daml", "module Main where\n");

    let (is_error, body) = sandbox
        .call(
            "damlviewer_generate_table",
            json!({ "path": input, "timeout": 1 }),
        )
        .await;

    assert!(!is_error);
    assert_eq!(body["status"], "timeout");
    assert_eq!(body["error"], "Timed out after 1 seconds");

    let (_, active) = sandbox.call("list_active_runs", json!({})).await;
    assert_eq!(active["count"], 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn second_run_rejected_while_first_is_active() {
    let sandbox = Sandbox::with(&tools().slow, |c| c.max_concurrent = 1);
    let input = sandbox.upload("Main.daml", "module Main where\n");

    let first = {
        let server = sandbox.server.clone();
        let args = json!({ "path": input });
        tokio::spawn(async move { call(&server, "damlviewer_generate_table", args).await })
    };

    let mut active = Value::Null;
    for _ in 0..200 {
        active = sandbox.call("list_active_runs", json!({})).await.1;
        if active["count"] == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(active["count"], 1);
    assert_eq!(active["max_concurrent"], 1);
    assert_eq!(active["active_runs"][0]["input_path"], input.display().to_string());

    let (is_error, body) = sandbox
        .call("damlviewer_generate_table", json!({ "path": input }))
        .await;
    assert!(is_error);
    assert_eq!(body["error"], "concurrency_limit_exceeded");
    assert_eq!(body["message"], "Maximum concurrent runs (1) reached.");
    assert_eq!(sandbox.server.orchestrator().store().len(), 1);

    let (_, finished) = first.await.unwrap();
    assert_eq!(finished["status"], "completed");
    assert_eq!(finished["table_preview"], "slow\n");

    let (_, listed) = sandbox.call("list_runs", json!({})).await;
    assert_eq!(listed["count"], 1);
}

// ============================================================================
// Queries and Resources
// ============================================================================

#[tokio::test]
async fn list_and_get_runs() {
    let tools = tools();
    let ok = Sandbox::new(&tools.ok);
    let input = ok.upload("Main.daml", "module Main where\n");

    let mut ids = Vec::new();
    for _ in 0..3 {
        let (_, body) = ok
            .call("damlviewer_generate_table", json!({ "path": input }))
            .await;
        ids.push(body["run_id"].as_str().unwrap().to_string());
    }

    let (_, listed) = ok.call("list_runs", json!({ "limit": 2 })).await;
    assert_eq!(listed["count"], 2);
    assert_eq!(listed["runs"][0]["run_id"], ids[2].as_str());
    assert_eq!(listed["runs"][1]["run_id"], ids[1].as_str());
    assert!(listed["runs"][0].get("table_preview").is_none());

    let (_, failed) = ok.call("list_runs", json!({ "status": "failed" })).await;
    assert_eq!(failed["count"], 0);

    let (is_error, fetched) = ok
        .call(
            "get_run_results",
            json!({ "run_id": ids[0], "include_table_preview": false }),
        )
        .await;
    assert!(!is_error);
    assert_eq!(fetched["run_id"], ids[0].as_str());
    assert!(fetched.get("table_preview").is_none());

    let (is_error, missing) = ok
        .call("get_run_results", json!({ "run_id": "ffffffff" }))
        .await;
    assert!(is_error);
    assert_eq!(missing["error"], "not_found");
}

#[tokio::test]
async fn finished_runs_are_resources() {
    let sandbox = Sandbox::new(&tools().ok);
    let input = sandbox.upload("Main.daml", "module Main where\n");

    let (_, body) = sandbox
        .call("damlviewer_generate_table", json!({ "path": input }))
        .await;
    let run_id = body["run_id"].as_str().unwrap();

    let resources = sandbox.server.run_resources();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].raw.uri, format!("damlviewer://runs/{}", run_id));
    assert_eq!(resources[0].raw.name, "DAML Viewer Run (completed)");
    assert_eq!(
        resources[0].raw.mime_type.as_deref(),
        Some("application/json")
    );

    let text = sandbox
        .server
        .read_run_resource(&format!("damlviewer://runs/{}", run_id))
        .await;
    let full: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(full["run_id"], run_id);
    assert!(full["stdout"].as_str().unwrap().starts_with("wrote "));
    assert_eq!(full["stderr"], "");
    assert_eq!(full["table_preview"], TABLE);
}
