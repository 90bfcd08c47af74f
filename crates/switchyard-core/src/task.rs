use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A free-text task produced by the upstream intent layer. Read-only to the
/// routing engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    pub raw_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_tool_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_skill: Option<String>,
}

impl Task {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            raw_prompt: prompt.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Subtask
// ---------------------------------------------------------------------------

/// One concurrently-dispatched unit of work, carrying the resources (file
/// paths) the external tool is expected to write to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub task: Task,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_resources: Vec<String>,
}

impl Subtask {
    pub fn new(task: Task, required_resources: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            required_resources,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_deserializes_with_optional_fields_absent() {
        let task: Task = serde_json::from_str(r#"{"raw_prompt":"say hi"}"#).unwrap();
        assert_eq!(task.raw_prompt, "say hi");
        assert!(task.explicit_tool_hint.is_none());
        assert!(task.detected_agent.is_none());
        assert!(task.detected_skill.is_none());
    }

    #[test]
    fn subtasks_get_distinct_ids() {
        let a = Subtask::new(Task::new("one"), vec![]);
        let b = Subtask::new(Task::new("two"), vec![]);
        assert_ne!(a.id, b.id);
    }
}
