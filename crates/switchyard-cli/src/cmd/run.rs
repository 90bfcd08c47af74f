use std::path::Path;
use std::time::Duration;

use switchyard_core::{RouterConfig, Task};

use crate::output;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    home: &Path,
    prompt: String,
    tool: Option<String>,
    agent: Option<String>,
    skill: Option<String>,
    timeout_secs: u64,
    json: bool,
) -> anyhow::Result<()> {
    let config = RouterConfig {
        exec_timeout: Duration::from_secs(timeout_secs),
        ..RouterConfig::default()
    };
    let router = super::build_router(home, config)?;

    let task = Task {
        raw_prompt: prompt,
        explicit_tool_hint: tool,
        detected_agent: agent,
        detected_skill: skill,
    };

    let outcome = router.route(&task).await?;

    if json {
        output::print_json(&outcome)?;
    } else {
        if !outcome.result.stdout.is_empty() {
            println!("{}", outcome.result.stdout);
        }
        // The tool's own stderr is surfaced verbatim, never paraphrased
        if !outcome.result.stderr.is_empty() {
            eprintln!("{}", outcome.result.stderr);
        }
        if outcome.fallback_used {
            eprintln!("note: answered by fallback tool '{}'", outcome.tool_name);
        }
        if !outcome.result.success {
            let code = outcome
                .result
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none".into());
            eprintln!(
                "'{}' failed (exit code {code}{})",
                outcome.tool_name,
                if outcome.result.timed_out() {
                    ", timed out"
                } else {
                    ""
                }
            );
        }
    }

    if !outcome.result.success {
        std::process::exit(outcome.result.exit_code.unwrap_or(1).max(1));
    }
    Ok(())
}
