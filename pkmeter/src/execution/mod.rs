//! External command execution for widget data sources
//!
//! Handles bounded execution of helper programs (nvidia-settings, playerctl):
//! - Direct program + argument invocation, no shell
//! - Timeout on every call, after which the child is killed
//! - Captured stdout / stderr and exit code

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Command execution result
#[derive(Debug, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub execution_time_ms: u128,
}

impl ExecutionResult {
    /// Stdout of a successful run, or an error carrying stderr.
    pub fn into_output(self, program: &str) -> Result<String> {
        if self.success {
            return Ok(self.output);
        }
        Err(anyhow!(
            "{} exited with {:?}: {}",
            program,
            self.exit_code,
            self.error.unwrap_or_default().trim()
        ))
    }
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Run `program` with `args`, giving up after `timeout`.
    pub async fn run(program: &str, args: &[&str], timeout: Duration) -> Result<ExecutionResult> {
        let start_time = Instant::now();
        debug!("Executing {} {:?} (timeout: {:?})", program, args, timeout);

        let output = tokio::time::timeout(
            timeout,
            AsyncCommand::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .with_context(|| format!("{program} timed out after {timeout:?}"))?
        .with_context(|| format!("Failed to execute {program}"))?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Ok(ExecutionResult {
            success: output.status.success(),
            output: String::from_utf8_lossy(&output.stdout).to_string(),
            error: (!stderr.is_empty()).then_some(stderr),
            exit_code: output.status.code(),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Run and return stdout, treating a non-zero exit as an error.
    pub async fn output(program: &str, args: &[&str], timeout: Duration) -> Result<String> {
        Self::run(program, args, timeout).await?.into_output(program)
    }
}
