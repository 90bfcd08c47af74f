use std::path::Path;

use serde::Serialize;

use crate::output;

#[derive(Serialize)]
struct ToolRow {
    name: String,
    display_name: String,
    installed: bool,
    fallback: Option<String>,
    agent_detection: bool,
    skill_detection: bool,
    cached_version: Option<String>,
}

pub fn run(home: &Path, json: bool) -> anyhow::Result<()> {
    let (registry, cache, _failures) = super::open_engine(home)?;

    for warning in registry.validate() {
        eprintln!("warning: {}", warning.message);
    }

    let rows: Vec<ToolRow> = registry
        .tools
        .iter()
        .map(|spec| ToolRow {
            name: spec.name.clone(),
            display_name: spec.display_name.clone(),
            installed: cache.is_installed(spec),
            fallback: spec.fallback.clone(),
            agent_detection: spec.agent_detection,
            skill_detection: spec.skill_detection,
            cached_version: cache
                .peek(&spec.name)
                .ok()
                .flatten()
                .and_then(|m| m.version),
        })
        .collect();

    if json {
        return output::print_json(&rows);
    }

    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.name.clone(),
                row.display_name.clone(),
                if row.installed { "yes" } else { "no" }.to_string(),
                row.fallback.clone().unwrap_or_else(|| "-".into()),
                detects(row),
                row.cached_version.clone().unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    output::print_table(
        &["NAME", "DISPLAY", "INSTALLED", "FALLBACK", "DETECTS", "CACHED"],
        &table,
    );
    Ok(())
}

fn detects(row: &ToolRow) -> String {
    match (row.agent_detection, row.skill_detection) {
        (true, true) => "agents+skills".into(),
        (true, false) => "agents".into(),
        (false, true) => "skills".into(),
        (false, false) => "-".into(),
    }
}
