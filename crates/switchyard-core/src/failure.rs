//! Append-only failure log.
//!
//! Every probe, synthesis, and execution failure is recorded as one JSONL
//! line in `failures.jsonl`. The log is diagnostic output for operators and
//! the input to probe-retry suppression; the synthesis logic itself never
//! reads it.

use crate::error::Result;
use crate::io;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Probe,
    Synthesis,
    Execution,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Probe => "probe",
            ErrorKind::Synthesis => "synthesis",
            ErrorKind::Execution => "execution",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FailureRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub tool_name: String,
    pub command_attempted: String,
    pub error_kind: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(
        tool_name: impl Into<String>,
        command_attempted: impl Into<String>,
        error_kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            command_attempted: command_attempted.into(),
            error_kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// FailureLog
// ---------------------------------------------------------------------------

pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Records are never rewritten or removed.
    pub fn append(&self, record: &FailureRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        io::append_text(&self.path, &line)
    }

    /// All records, newest first. `limit = 0` returns everything.
    pub fn list(&self, limit: usize) -> Result<Vec<FailureRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let mut records: Vec<FailureRecord> = data
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect();
        records.reverse();
        if limit > 0 {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Count records for `tool_name` of the given kind at or after `since`.
    /// Used to suppress re-probing after repeated recent probe failures.
    pub fn recent_count(
        &self,
        tool_name: &str,
        kind: ErrorKind,
        since: DateTime<Utc>,
    ) -> Result<usize> {
        let records = self.list(0)?;
        Ok(records
            .iter()
            .filter(|r| r.tool_name == tool_name && r.error_kind == kind && r.timestamp >= since)
            .count())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
