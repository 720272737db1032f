#[cfg(test)]
#[path = "process_test.rs"]
mod tests;

use std::path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ExecutionResult;
use crate::domain::models::Runner;

/// Runs artifacts with an external interpreter, one fresh process per run.
pub struct ProcessRunner {
    interpreter: String,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(interpreter: &str, timeout: Duration) -> ProcessRunner {
        return ProcessRunner {
            interpreter: interpreter.to_string(),
            timeout,
        };
    }

    pub fn from_config() -> Result<ProcessRunner> {
        return ProcessRunner::from_values(
            &Config::get(ConfigKey::Interpreter),
            &Config::get(ConfigKey::ExecutionTimeout),
        );
    }

    fn from_values(interpreter: &str, timeout_secs: &str) -> Result<ProcessRunner> {
        let interpreter = interpreter.trim();
        if interpreter.is_empty() {
            bail!("No interpreter configured. Set one with --interpreter.");
        }

        let timeout = match timeout_secs.trim().parse::<u64>() {
            Ok(val) if val > 0 => Duration::from_secs(val),
            _ => bail!("execution-timeout must be a whole number of seconds greater than 0"),
        };

        return Ok(ProcessRunner::new(interpreter, timeout));
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    #[allow(clippy::implicit_return)]
    async fn execute(&self, filename: &path::Path) -> Result<ExecutionResult> {
        let child = Command::new(&self.interpreter)
            .arg(filename)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                return anyhow!(
                    "Failed to start interpreter '{}': {err}",
                    self.interpreter
                );
            })?;

        // Dropping the unfinished future drops the child, which kills it.
        let output = match time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::warn!(
                    filename = ?filename,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Generated program timed out"
                );

                return Ok(ExecutionResult {
                    stdout: "".to_string(),
                    stderr: format!(
                        "Execution timed out after {} seconds and was terminated.",
                        self.timeout.as_secs_f64()
                    ),
                    filename: filename.to_path_buf(),
                    exit_code: None,
                    timed_out: true,
                });
            }
        };

        let result = ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            filename: filename.to_path_buf(),
            exit_code: output.status.code(),
            timed_out: false,
        };

        tracing::debug!(
            filename = ?filename,
            exit_code = ?result.exit_code,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Generated program finished"
        );

        return Ok(result);
    }
}
