mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::cache::CacheSubcommand;
use std::path::PathBuf;

use switchyard_core::paths;

#[derive(Parser)]
#[command(
    name = "switchyard",
    about = "Route free-text tasks to installed AI CLI tools: probe, score, synthesize, execute",
    version,
    propagate_version = true
)]
struct Cli {
    /// Data directory (default: ~/.switchyard)
    #[arg(long, global = true, env = "SWITCHYARD_HOME")]
    home: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default tool registry into the data directory
    Init,

    /// Route a task to the best-fitting installed tool and run it
    Run {
        /// The task text (quote it in your shell; it is passed through whole)
        prompt: String,

        /// Route to this tool, skipping scoring
        #[arg(long)]
        tool: Option<String>,

        /// Agent name detected by the upstream intent layer
        #[arg(long)]
        agent: Option<String>,

        /// Skill name detected by the upstream intent layer
        #[arg(long)]
        skill: Option<String>,

        /// Execution timeout in seconds
        #[arg(long, default_value = "300")]
        timeout_secs: u64,
    },

    /// Dispatch a batch of subtasks concurrently with resource locking
    Dispatch {
        /// YAML file: a list of {prompt, resources, tool?, agent?, skill?}
        file: PathBuf,

        /// Overall deadline in seconds for the whole batch
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Concurrently running subtasks
        #[arg(long, default_value = "3")]
        max_parallel: usize,
    },

    /// Probe a tool's help surface and show the captured capability model
    Probe {
        /// Tool name from the registry
        tool: String,

        /// Re-probe even if a fresh model is cached
        #[arg(long)]
        force: bool,
    },

    /// List registered tools, install state, and cached capabilities
    Tools,

    /// Inspect or invalidate cached capability models
    Cache {
        #[command(subcommand)]
        subcommand: CacheSubcommand,
    },

    /// Show recent failure records
    Failures {
        /// Maximum records to show (0 = all)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let home = match paths::data_dir(cli.home.as_deref()) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Init => cmd::init::run(&home),
        Commands::Run {
            prompt,
            tool,
            agent,
            skill,
            timeout_secs,
        } => cmd::run::run(&home, prompt, tool, agent, skill, timeout_secs, cli.json).await,
        Commands::Dispatch {
            file,
            deadline_secs,
            max_parallel,
        } => cmd::dispatch::run(&home, &file, deadline_secs, max_parallel, cli.json).await,
        Commands::Probe { tool, force } => cmd::probe::run(&home, &tool, force, cli.json).await,
        Commands::Tools => cmd::tools::run(&home, cli.json),
        Commands::Cache { subcommand } => cmd::cache::run(&home, subcommand, cli.json),
        Commands::Failures { limit } => cmd::failures::run(&home, limit, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
