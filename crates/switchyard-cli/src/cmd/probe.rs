use std::path::Path;

use anyhow::Context;

use crate::output;

pub async fn run(home: &Path, tool: &str, force: bool, json: bool) -> anyhow::Result<()> {
    let (registry, cache, failures) = super::open_engine(home)?;
    let spec = registry
        .get(tool)
        .with_context(|| format!("tool not registered: {tool}"))?;

    if force {
        cache.invalidate(&spec.name)?;
    }

    let model = cache.get(spec, &failures).await?;

    if json {
        output::print_json(&model)?;
        return Ok(());
    }

    println!("tool:             {}", model.tool_name);
    println!(
        "version:          {}",
        model.version.as_deref().unwrap_or("unknown")
    );
    println!("pattern:          {}", model.execution_pattern.as_str());
    println!(
        "non-interactive:  {}",
        model.non_interactive_flag.as_deref().unwrap_or("-")
    );
    println!(
        "prompt flag:      {}",
        model.prompt_flag.as_deref().unwrap_or("-")
    );
    println!(
        "source:           {}",
        match model.sourced_from {
            switchyard_core::CapabilitySource::Probed => "probed",
            switchyard_core::CapabilitySource::FallbackTemplate => "fallback template",
        }
    );
    println!("captured:         {}", model.captured_at.to_rfc3339());
    println!("options:          {}", join_or_dash(&model.options));
    println!("subcommands:      {}", join_or_dash(&model.subcommands));
    Ok(())
}

fn join_or_dash(set: &std::collections::BTreeSet<String>) -> String {
    if set.is_empty() {
        "-".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(" ")
    }
}
