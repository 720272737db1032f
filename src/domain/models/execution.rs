use std::path;

use anyhow::Result;
use async_trait::async_trait;

/// Captured output of one run of a generated program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub filename: path::PathBuf,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Any stderr output counts as a failure, warnings included.
    pub fn failed(&self) -> bool {
        return self.timed_out || !self.stderr.trim().is_empty();
    }
}

#[async_trait]
pub trait Runner {
    /// Runs the program at `filename` to completion. A program that exits
    /// non-zero or writes to stderr is not an error here; only failing to run
    /// it at all is.
    async fn execute(&self, filename: &path::Path) -> Result<ExecutionResult>;
}

pub type RunnerBox = Box<dyn Runner + Send + Sync>;
