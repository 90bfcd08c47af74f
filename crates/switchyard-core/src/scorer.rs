//! Two-stage compatibility scoring.
//!
//! Stage 1 is a cheap substring test over the prompt; only when it signals a
//! possible agent/skill mention does Stage 2 run the detailed match against
//! the registry of known names. The short-circuit boundary is an explicit
//! function call so each stage is testable on its own.

use crate::capability::CapabilityModel;
use crate::registry::ToolRegistry;
use crate::task::Task;
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// ScoreParams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScoreParams {
    /// Score for a tool declaring neither detection capability.
    pub base_floor: f64,
    /// Added per declared detection capability, match or no match.
    pub detection_bonus: f64,
    /// Added per resolved mention the tool can actually detect.
    pub mention_bonus: f64,
    pub cap: f64,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            base_floor: 0.5,
            detection_bonus: 0.2,
            mention_bonus: 0.1,
            cap: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage 1: cheap pre-check
// ---------------------------------------------------------------------------

/// Fixed vocabulary that makes a prompt worth the detailed match.
const CAPABILITY_WORDS: [&str; 2] = ["agent", "skill"];

/// Cheap lowercase substring test: does the prompt mention agents or skills
/// at all, by keyword or by a registered name?
pub fn mentions_capability(prompt: &str, registry: &ToolRegistry) -> bool {
    let prompt = prompt.to_lowercase();
    if CAPABILITY_WORDS.iter().any(|w| prompt.contains(w)) {
        return true;
    }
    registry
        .agents
        .iter()
        .chain(registry.skills.iter())
        .any(|name| prompt.contains(&name.to_lowercase()))
}

// ---------------------------------------------------------------------------
// Stage 2: detailed match
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mention {
    pub agent: Option<String>,
    pub skill: Option<String>,
}

impl Mention {
    pub fn is_empty(&self) -> bool {
        self.agent.is_none() && self.skill.is_none()
    }
}

/// Resolve which registered agent/skill names the prompt actually mentions.
///
/// Exact matching is case-insensitive substring containment; fuzzy matching
/// compares with all non-alphanumerics stripped, so "code reviewer" still
/// resolves the registered "code-reviewer".
pub fn resolve_mention(prompt: &str, registry: &ToolRegistry) -> Mention {
    let lower = prompt.to_lowercase();
    let normalized = normalize(&lower);
    Mention {
        agent: match_name(&lower, &normalized, &registry.agents),
        skill: match_name(&lower, &normalized, &registry.skills),
    }
}

fn match_name(lower: &str, normalized: &str, names: &[String]) -> Option<String> {
    for name in names {
        let name_lower = name.to_lowercase();
        if lower.contains(&name_lower) || normalized.contains(&normalize(&name_lower)) {
            return Some(name.clone());
        }
    }
    None
}

fn normalize(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

// ---------------------------------------------------------------------------
// score
// ---------------------------------------------------------------------------

/// Rank candidate tools for a task, best first.
///
/// Ties keep declaration order: the sort is stable and compares score only.
pub fn score(
    task: &Task,
    candidates: &[CapabilityModel],
    registry: &ToolRegistry,
    params: &ScoreParams,
) -> Vec<(String, f64)> {
    let mention = if mentions_capability(&task.raw_prompt, registry) {
        resolve_mention(&task.raw_prompt, registry)
    } else {
        Mention::default()
    };

    let mut scored: Vec<(String, f64)> = candidates
        .iter()
        .map(|model| {
            let mut score = params.base_floor;
            if model.agent_detection {
                score += params.detection_bonus;
            }
            if model.skill_detection {
                score += params.detection_bonus;
            }
            if mention.agent.is_some() && model.agent_detection {
                score += params.mention_bonus;
            }
            if mention.skill.is_some() && model.skill_detection {
                score += params.mention_bonus;
            }
            (model.tool_name.clone(), score.min(params.cap))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
