//! Process executor - runs one argv under a timeout
//!
//! The executor knows nothing about runs or records: it launches a program,
//! collects its output, and reports how it ended. A non-zero exit code is a
//! normal result; only launch failures, timeouts and I/O errors are errors.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;

/// Exit code reported when the process was terminated by a signal
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// What a finished subprocess produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Launches subprocesses with captured output and a hard timeout
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    env: Vec<(String, String)>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra environment applied to every subprocess
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Run `argv` in `cwd`, killing it if it outlives `timeout`.
    ///
    /// On timeout the child is killed and reaped before returning, and any
    /// partial output is discarded.
    #[instrument(skip(self, argv), fields(program = %argv.first().map(String::as_str).unwrap_or("")))]
    pub async fn execute(
        &self,
        argv: &[String],
        cwd: &Path,
        timeout: Duration,
    ) -> Result<ExecOutput, ExecError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ExecError::Spawn("empty command".to_string()))?;

        debug!("Running command: {} (cwd={})", argv.join(" "), cwd.display());

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if std::env::var_os("TERM").is_none() {
            cmd.env("TERM", "dumb");
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{}: {}", program, e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collected = tokio::time::timeout(timeout, async {
            let (status, stdout, stderr) =
                tokio::join!(child.wait(), read_all(stdout), read_all(stderr));
            Ok::<_, std::io::Error>((status?, stdout?, stderr?))
        })
        .await;

        match collected {
            Ok(Ok((status, stdout, stderr))) => {
                let exit_code = status.code().unwrap_or(SIGNAL_EXIT_CODE);
                debug!(exit_code, "command finished");
                Ok(ExecOutput {
                    exit_code,
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                })
            }
            Ok(Err(e)) => Err(ExecError::Io(e)),
            Err(_elapsed) => {
                warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!("failed to kill timed out process: {}", e);
                }
                Err(ExecError::Timeout(timeout))
            }
        }
    }
}

async fn read_all<R>(pipe: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
