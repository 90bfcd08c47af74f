//! The probing seam between the engine and the subprocess layer.
//!
//! `ToolProber` is implemented by the real driver (spawning `tool --help`)
//! and by in-memory mocks in tests, so cache and router behavior can be
//! verified without external binaries on PATH.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ProbeFailure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeReason {
    /// The binary is not on PATH.
    NotFound,
    /// Every help form ran but produced no output.
    EmptyOutput,
    /// The help invocation exceeded its timeout.
    Timeout,
    /// The process could not be spawned.
    Spawn,
}

impl ProbeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeReason::NotFound => "not_found",
            ProbeReason::EmptyOutput => "empty_output",
            ProbeReason::Timeout => "timeout",
            ProbeReason::Spawn => "spawn",
        }
    }
}

impl fmt::Display for ProbeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed help probe. Recovered locally by the capability cache (stale
/// entry, then built-in template); never fatal to a routing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub tool: String,
    pub reason: ProbeReason,
    pub message: String,
}

impl ProbeFailure {
    pub fn new(tool: impl Into<String>, reason: ProbeReason, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe of '{}' failed ({}): {}", self.tool, self.reason, self.message)
    }
}

impl std::error::Error for ProbeFailure {}

// ---------------------------------------------------------------------------
// ToolProber
// ---------------------------------------------------------------------------

pub trait ToolProber {
    /// Capture the tool's help output, trying the conventional help forms
    /// and stopping at the first non-empty result.
    fn help_text(
        &self,
        bin: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<String, ProbeFailure>> + Send;

    /// The version the installed binary reports, if any.
    fn installed_version(
        &self,
        bin: &str,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Option<String>> + Send;

    /// Whether the binary is resolvable on PATH.
    fn is_installed(&self, bin: &str) -> bool {
        which::which(bin).is_ok()
    }
}
