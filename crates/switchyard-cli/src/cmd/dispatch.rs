use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use switchyard_core::{RouterConfig, Subtask, SubtaskStatus, Task};

use crate::output;

/// One entry of the dispatch file: a YAML list of these.
#[derive(Debug, Deserialize)]
struct SubtaskEntry {
    prompt: String,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    skill: Option<String>,
}

pub async fn run(
    home: &Path,
    file: &Path,
    deadline_secs: Option<u64>,
    max_parallel: usize,
    json: bool,
) -> anyhow::Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let entries: Vec<SubtaskEntry> = serde_yaml::from_str(&data)?;
    anyhow::ensure!(!entries.is_empty(), "no subtasks in {}", file.display());

    let config = RouterConfig {
        max_parallel,
        ..RouterConfig::default()
    };
    let router = super::build_router(home, config)?;

    let subtasks: Vec<Subtask> = entries
        .into_iter()
        .map(|e| {
            Subtask::new(
                Task {
                    raw_prompt: e.prompt,
                    explicit_tool_hint: e.tool,
                    detected_agent: e.agent,
                    detected_skill: e.skill,
                },
                e.resources,
            )
        })
        .collect();

    let summary = router
        .dispatch(subtasks, deadline_secs.map(Duration::from_secs))
        .await;

    if json {
        output::print_json(&summary)?;
    } else {
        let rows: Vec<Vec<String>> = summary
            .reports
            .iter()
            .map(|report| {
                let (status, detail) = match &report.status {
                    SubtaskStatus::Completed(outcome) => {
                        let status = if outcome.result.success {
                            "completed"
                        } else {
                            "exhausted"
                        };
                        (status, outcome.tool_name.clone())
                    }
                    SubtaskStatus::Skipped { reason } => ("skipped", reason.clone()),
                    SubtaskStatus::Failed { error } => ("failed", error.clone()),
                };
                vec![
                    short_id(report.subtask_id),
                    status.to_string(),
                    detail,
                    report.prompt.clone(),
                ]
            })
            .collect();
        output::print_table(&["SUBTASK", "STATUS", "TOOL/REASON", "PROMPT"], &rows);
        println!(
            "\n{} completed, {} skipped, {} failed",
            summary.completed(),
            summary.skipped(),
            summary.failed()
        );
    }

    if summary.completed() == 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn short_id(id: impl ToString) -> String {
    id.to_string().chars().take(8).collect()
}
