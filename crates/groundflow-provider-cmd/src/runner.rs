//! Provider command wrapper
//!
//! Invokes the configured executable once per operation: the operation
//! name is passed as the single argument, the request document is
//! written to stdin as one line of JSON, and the response is read from
//! stdout as JSON. A non-zero exit status is a provider failure.

use crate::error::{CmdError, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Executable wrapper
pub struct CommandRunner {
    command: String,
}

impl CommandRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Run one operation and return the parsed response
    pub async fn invoke(
        &self,
        operation: &str,
        request: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let mut cmd = Command::new(&self.command);
        cmd.arg(operation);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(command = %self.command, operation, "Running provider command");

        let mut child = cmd.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let mut line = serde_json::to_string(request)?;
            line.push('\n');
            // コマンドがstdinを読まずに終了した場合の書き込みエラーは無視
            let _ = stdin.write_all(line.as_bytes()).await;
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CmdError::CommandFailed {
                operation: operation.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        Ok(serde_json::from_str(stdout.trim())?)
    }
}
