//! Child-process execution of single shell commands

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::errors::EngineError;

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,

    /// `None` when the process was terminated by a signal
    pub return_code: Option<i32>,
}

/// Runs one shell command to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// `Err` means the command could not be run or did not finish in time.
    /// A non-zero exit is an `Ok` with `success == false`.
    async fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput, EngineError>;
}

/// `sh -c` runner with a per-command time limit
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput, EngineError> {
        debug!("Running `{}` in {}", command, working_dir.display());

        let child = Command::new("sh")
            .args(["-c", command])
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::CommandError(format!("Failed to spawn command: {}", e)))?;

        // Dropping the future on timeout kills the child
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                EngineError::Timeout(format!(
                    "command did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })??;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            return_code: output.status.code(),
        })
    }
}
