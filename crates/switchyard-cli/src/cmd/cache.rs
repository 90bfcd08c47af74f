use std::path::Path;

use clap::Subcommand;

use crate::output;

#[derive(Subcommand)]
pub enum CacheSubcommand {
    /// List all cached capability models
    List,

    /// Show the cached model for one tool
    Show {
        /// Tool name
        tool: String,
    },

    /// Drop the cached model for one tool, forcing a re-probe
    Invalidate {
        /// Tool name
        tool: String,
    },
}

pub fn run(home: &Path, subcommand: CacheSubcommand, json: bool) -> anyhow::Result<()> {
    let (_registry, cache, _failures) = super::open_engine(home)?;

    match subcommand {
        CacheSubcommand::List => {
            let models = cache.list()?;
            if json {
                return output::print_json(&models);
            }
            if models.is_empty() {
                println!("Cache is empty.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = models
                .iter()
                .map(|m| {
                    vec![
                        m.tool_name.clone(),
                        m.version.clone().unwrap_or_else(|| "-".into()),
                        m.execution_pattern.as_str().to_string(),
                        m.non_interactive_flag.clone().unwrap_or_else(|| "-".into()),
                        m.captured_at.to_rfc3339(),
                    ]
                })
                .collect();
            output::print_table(
                &["TOOL", "VERSION", "PATTERN", "NON-INTERACTIVE", "CAPTURED"],
                &rows,
            );
        }
        CacheSubcommand::Show { tool } => match cache.peek(&tool)? {
            Some(model) => output::print_json(&model)?,
            None => anyhow::bail!("no cached model for '{tool}'"),
        },
        CacheSubcommand::Invalidate { tool } => {
            cache.invalidate(&tool)?;
            println!("Invalidated cached model for '{tool}'.");
        }
    }
    Ok(())
}
