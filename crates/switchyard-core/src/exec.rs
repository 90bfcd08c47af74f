//! The execution seam between the engine and the subprocess layer.

use crate::failure::ErrorKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// The outcome of one external tool invocation.
///
/// A zero exit code is a success regardless of stderr content (tools may
/// emit warnings on success); anything else carries an `error_kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub tool_name: String,
    /// None when the process was killed by a signal or never reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ExecutionResult {
    pub fn timed_out(&self) -> bool {
        self.error_kind == Some(ErrorKind::Timeout)
    }
}

// ---------------------------------------------------------------------------
// ToolExecutor
// ---------------------------------------------------------------------------

pub trait ToolExecutor {
    /// Run `bin argv...` with a hard timeout and classify the result.
    ///
    /// Implementations must not fail: spawn errors, non-zero exits, and
    /// timeouts all come back as an `ExecutionResult` with `success=false`.
    fn execute(
        &self,
        tool_name: &str,
        bin: &str,
        argv: &[String],
        timeout: Duration,
    ) -> impl std::future::Future<Output = ExecutionResult> + Send;
}
