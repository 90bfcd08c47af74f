//! Command-line synthesis.
//!
//! A fixed, ordered catalogue of candidate argv formats is filtered by what
//! the capability model supports, sorted by priority, and the first format
//! whose rendering survives the no-invented-flags check wins. When nothing
//! survives, synthesis fails explicitly; the engine never guesses a
//! command line.

use crate::capability::{CapabilityModel, ExecutionPattern};
use crate::error::{Result, RouterError};
use crate::task::Task;
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// CandidateFormat
// ---------------------------------------------------------------------------

/// One candidate argv shape, evaluated in priority order.
pub struct CandidateFormat {
    pub name: &'static str,
    pub priority: i32,
    pub supports: fn(&CapabilityModel) -> bool,
    pub render: fn(&Task, &CapabilityModel) -> Vec<String>,
}

/// The full catalogue. Positional ranks highest but is withdrawn whenever
/// the model declares flag-based execution with a known non-interactive
/// flag, since handing a bare string to such a CLI earns a "too many arguments"
/// rejection.
static CATALOGUE: [CandidateFormat; 3] = [
    CandidateFormat {
        name: "positional",
        priority: 10,
        supports: |model| {
            !(model.execution_pattern == ExecutionPattern::FlagBased
                && model.non_interactive_flag.is_some())
        },
        render: |task, _model| vec![prompt_text(task)],
    },
    CandidateFormat {
        name: "flag-based-non-interactive",
        priority: 9,
        supports: |model| model.non_interactive_flag.is_some(),
        render: |task, model| {
            let flag = model.non_interactive_flag.clone().unwrap_or_default();
            vec![flag, quote(&prompt_text(task))]
        },
    },
    CandidateFormat {
        name: "flag-based-prompt-flag",
        priority: 8,
        supports: |model| {
            model.non_interactive_flag.is_some() && model.prompt_flag.is_some()
        },
        render: |task, model| {
            let ni = model.non_interactive_flag.clone().unwrap_or_default();
            let prompt = model.prompt_flag.clone().unwrap_or_default();
            vec![ni, prompt, quote(&prompt_text(task))]
        },
    },
];

pub fn catalogue() -> &'static [CandidateFormat] {
    &CATALOGUE
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Synthesis {
    pub format: &'static str,
    pub argv: Vec<String>,
}

/// Build the argv for `task` against `model`.
pub fn synthesize(task: &Task, model: &CapabilityModel) -> Result<Synthesis> {
    let mut formats: Vec<&CandidateFormat> = catalogue()
        .iter()
        .filter(|f| (f.supports)(model))
        .collect();
    formats.sort_by(|a, b| b.priority.cmp(&a.priority));

    for format in formats {
        let argv = (format.render)(task, model);
        if let Some(unknown) = first_unknown_option(&argv, model) {
            tracing::debug!(
                tool = %model.tool_name,
                format = format.name,
                option = %unknown,
                "format rejected: option not in capability model"
            );
            continue;
        }
        return Ok(Synthesis {
            format: format.name,
            argv,
        });
    }

    Err(RouterError::NoCompatibleFormat {
        tool: model.tool_name.clone(),
    })
}

/// The first argv element that looks like an option but is absent from the
/// model's discovered option set, if any.
fn first_unknown_option<'a>(argv: &'a [String], model: &CapabilityModel) -> Option<&'a str> {
    argv.iter()
        .map(String::as_str)
        .filter(|a| looks_like_option(a))
        .find(|a| !model.supports_option(a))
}

fn looks_like_option(arg: &str) -> bool {
    arg.starts_with('-')
        && arg.len() > 1
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '=')
}

// ---------------------------------------------------------------------------
// Prompt rendering
// ---------------------------------------------------------------------------

/// One task string: detected agent/skill mentions are prefixed into the
/// prompt text, never emitted as separate argv elements.
fn prompt_text(task: &Task) -> String {
    let mut text = String::new();
    if let Some(agent) = &task.detected_agent {
        let _ = write!(text, "Use the '{agent}' agent. ");
    }
    if let Some(skill) = &task.detected_skill {
        let _ = write!(text, "Apply the '{skill}' skill. ");
    }
    text.push_str(task.raw_prompt.trim());
    text
}

/// Shell-style quoting for flag-carried prompts; inner quotes are escaped.
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
