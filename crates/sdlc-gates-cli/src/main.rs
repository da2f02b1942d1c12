mod cmd;
mod output;
mod probe;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, level::LevelSubcommand, Ctx};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sdlc-gates",
    about = "Gate enforcement for multi-phase SDLC workflows: approvals, consensus and phase order",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .sdlc/ or .git/)
    #[arg(long, global = true, env = "SDLC_ROOT")]
    root: Option<PathBuf>,

    /// Workflow level (default: .sdlc/level.json, else production)
    #[arg(long, global = true, env = "SDLC_LEVEL")]
    level: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a gate's requirements are met
    Check { gate: String },

    /// Record an agent's approval of a gate
    Approve { gate: String, agent: String },

    /// Check whether work may move from one phase to the next
    Proceed { current: String, next: String },

    /// Show every gate with its approvals and derived status
    Status,

    /// Resolve a disagreement between agents on a gate
    Resolve {
        /// Gate where the conflict occurred
        #[arg(long)]
        gate: String,
        /// Conflicting agents, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        agents: Vec<String>,
    },

    /// Show the mandatory agent sequence for a scenario
    Sequence { scenario: String },

    /// Show or change the project's workflow level
    Level {
        #[command(subcommand)]
        subcommand: LevelSubcommand,
    },

    /// Inspect and validate the gate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Ctx {
        root: root::resolve_root(cli.root.as_deref()),
        level: cli.level,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Check { gate } => cmd::check::run(&ctx, &gate),
        Commands::Approve { gate, agent } => cmd::approve::run(&ctx, &gate, &agent),
        Commands::Proceed { current, next } => cmd::proceed::run(&ctx, &current, &next),
        Commands::Status => cmd::status::run(&ctx),
        Commands::Resolve { gate, agents } => cmd::resolve::run(&ctx, &gate, &agents),
        Commands::Sequence { scenario } => cmd::sequence::run(&ctx, &scenario),
        Commands::Level { subcommand } => cmd::level::run(&ctx, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(cmd::exit_code(&e));
    }
}
