use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// ExecutionPattern / CapabilitySource
// ---------------------------------------------------------------------------

/// How a tool expects its task text: via a dedicated flag or as a bare
/// trailing argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPattern {
    FlagBased,
    Positional,
}

impl ExecutionPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPattern::FlagBased => "flag_based",
            ExecutionPattern::Positional => "positional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilitySource {
    Probed,
    FallbackTemplate,
}

// ---------------------------------------------------------------------------
// CapabilityModel
// ---------------------------------------------------------------------------

/// Structured description of how to invoke one external tool
/// non-interactively, captured once per (tool, version).
///
/// Models are immutable after capture: a version change or TTL expiry makes
/// the cached entry eligible for replacement, never for in-place mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityModel {
    pub tool_name: String,
    /// Version reported by the installed binary; None if it reports nothing
    /// parseable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub options: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subcommands: BTreeSet<String>,
    pub execution_pattern: ExecutionPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_interactive_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_flag: Option<String>,
    /// Declared by the registry entry, stamped onto every captured model.
    #[serde(default)]
    pub agent_detection: bool,
    #[serde(default)]
    pub skill_detection: bool,
    pub sourced_from: CapabilitySource,
    pub captured_at: DateTime<Utc>,
}

impl CapabilityModel {
    /// The fail-soft floor: a bare positional model with nothing discovered.
    pub fn minimal(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            version: None,
            options: BTreeSet::new(),
            subcommands: BTreeSet::new(),
            execution_pattern: ExecutionPattern::Positional,
            non_interactive_flag: None,
            prompt_flag: None,
            agent_detection: false,
            skill_detection: false,
            sourced_from: CapabilitySource::Probed,
            captured_at: Utc::now(),
        }
    }

    pub fn supports_option(&self, option: &str) -> bool {
        self.options.contains(option)
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.captured_at
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
