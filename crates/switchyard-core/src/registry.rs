//! Data-driven tool registry.
//!
//! Adding a new external tool is a registry entry, not a code path: each
//! entry carries the static metadata the installation layer supplies:
//! display name, binary name, fallback partner, agent/skill detection
//! declarations, and a built-in template capability model used when probing
//! is impossible. The registry also holds the known agent and skill names
//! the scorer matches mentions against.

use crate::capability::{CapabilityModel, CapabilitySource, ExecutionPattern};
use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// RegistryWarning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryWarning {
    pub message: String,
}

// ---------------------------------------------------------------------------
// TemplateModel
// ---------------------------------------------------------------------------

/// The built-in invocation template for a tool, used verbatim when its help
/// surface cannot be probed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateModel {
    pub execution_pattern: ExecutionPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_interactive_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

// ---------------------------------------------------------------------------
// ToolSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub display_name: String,
    /// Executable name when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<String>,
    /// The single fallback partner tried after an execution failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default)]
    pub agent_detection: bool,
    #[serde(default)]
    pub skill_detection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateModel>,
}

impl ToolSpec {
    pub fn bin_name(&self) -> &str {
        self.bin.as_deref().unwrap_or(&self.name)
    }

    /// Copy the registry's detection declarations onto a captured model.
    pub fn stamp_declarations(&self, model: &mut CapabilityModel) {
        model.agent_detection = self.agent_detection;
        model.skill_detection = self.skill_detection;
    }

    /// The capability model used when probing is impossible: the configured
    /// template if any, otherwise a minimal positional model.
    pub fn fallback_model(&self) -> CapabilityModel {
        let mut model = CapabilityModel::minimal(&self.name);
        if let Some(template) = &self.template {
            model.execution_pattern = template.execution_pattern;
            model.non_interactive_flag = template.non_interactive_flag.clone();
            model.prompt_flag = template.prompt_flag.clone();
            model.options = template.options.iter().cloned().collect();
            // Template flags must be usable by synthesis
            if let Some(flag) = &template.non_interactive_flag {
                model.options.insert(flag.clone());
            }
            if let Some(flag) = &template.prompt_flag {
                model.options.insert(flag.clone());
            }
        }
        model.sourced_from = CapabilitySource::FallbackTemplate;
        self.stamp_declarations(&mut model);
        model
    }
}

// ---------------------------------------------------------------------------
// ToolRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRegistry {
    #[serde(default = "default_version")]
    pub version: u32,
    pub tools: Vec<ToolSpec>,
    /// Known agent names the scorer matches prompt mentions against.
    #[serde(default)]
    pub agents: Vec<String>,
    /// Known skill names, same purpose.
    #[serde(default)]
    pub skills: Vec<String>,
}

fn default_version() -> u32 {
    1
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            version: 1,
            tools: vec![
                ToolSpec {
                    name: "claude".into(),
                    display_name: "Claude Code".into(),
                    bin: None,
                    fallback: Some("gemini".into()),
                    agent_detection: true,
                    skill_detection: true,
                    template: Some(TemplateModel {
                        execution_pattern: ExecutionPattern::FlagBased,
                        non_interactive_flag: Some("--print".into()),
                        prompt_flag: None,
                        options: vec!["-p".into(), "--print".into(), "--model".into()],
                    }),
                },
                ToolSpec {
                    name: "gemini".into(),
                    display_name: "Gemini CLI".into(),
                    bin: None,
                    fallback: None,
                    agent_detection: false,
                    skill_detection: false,
                    template: Some(TemplateModel {
                        execution_pattern: ExecutionPattern::Positional,
                        non_interactive_flag: None,
                        prompt_flag: None,
                        options: vec!["--model".into()],
                    }),
                },
                ToolSpec {
                    name: "codex".into(),
                    display_name: "Codex CLI".into(),
                    bin: None,
                    fallback: None,
                    agent_detection: false,
                    skill_detection: true,
                    template: Some(TemplateModel {
                        execution_pattern: ExecutionPattern::Positional,
                        non_interactive_flag: None,
                        prompt_flag: None,
                        options: vec!["--model".into()],
                    }),
                },
            ],
            agents: vec![
                "code-reviewer".into(),
                "debugger".into(),
                "planner".into(),
            ],
            skills: vec![
                "commit-message".into(),
                "refactor".into(),
                "unit-tests".into(),
            ],
        }
    }
}

impl ToolRegistry {
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Tools whose binary resolves on PATH, in declaration order.
    pub fn installed(&self) -> Vec<&ToolSpec> {
        self.tools
            .iter()
            .filter(|t| which::which(t.bin_name()).is_ok())
            .collect()
    }

    /// Load the registry from `path`, falling back to the built-in default
    /// when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let registry: ToolRegistry = serde_yaml::from_str(&data)?;
        Ok(registry)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::registry_path(dir), data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<RegistryWarning> {
        let mut warnings = Vec::new();

        for (i, tool) in self.tools.iter().enumerate() {
            if self.tools[..i].iter().any(|t| t.name == tool.name) {
                warnings.push(RegistryWarning {
                    message: format!("duplicate tool entry '{}'", tool.name),
                });
            }
            if let Some(partner) = &tool.fallback {
                if partner == &tool.name {
                    warnings.push(RegistryWarning {
                        message: format!("tool '{}' lists itself as fallback", tool.name),
                    });
                } else if self.get(partner).is_none() {
                    warnings.push(RegistryWarning {
                        message: format!(
                            "tool '{}' has unknown fallback partner '{}'",
                            tool.name, partner
                        ),
                    });
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
