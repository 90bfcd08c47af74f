use std::path::Path;

use crate::output;

pub fn run(home: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let (_registry, _cache, failures) = super::open_engine(home)?;
    let records = failures.list(limit)?;

    if json {
        return output::print_json(&records);
    }

    if records.is_empty() {
        println!("No failures recorded.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.timestamp.to_rfc3339(),
                r.tool_name.clone(),
                r.error_kind.as_str().to_string(),
                r.message.clone(),
            ]
        })
        .collect();
    output::print_table(&["TIME", "TOOL", "KIND", "MESSAGE"], &rows);
    Ok(())
}
