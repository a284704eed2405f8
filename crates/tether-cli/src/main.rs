mod cmd_config;
mod cmd_hash;
mod cmd_init;
mod cmd_intents;
mod cmd_lesson;
mod cmd_prompt;
mod cmd_run;
mod cmd_trace;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tether_core::TetherPaths;

#[derive(Parser)]
#[command(name = "tether", version, about = "Intent-gated hooks for coding agents")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .orchestration/ workspace
    Init,
    /// List declared intents
    Intents {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the content fingerprint of a file (use as initial_hash)
    Hash {
        /// Workspace-relative or absolute path
        path: String,
    },
    /// Run the hook loop: JSON requests on stdin, responses on stdout
    Run,
    /// Inspect the audit trace
    Trace {
        #[command(subcommand)]
        cmd: cmd_trace::TraceCmd,
    },
    /// Append a lesson to AGENTS.md
    Lesson {
        /// Lesson text
        text: String,
        /// Category: failure, design, style, concurrency, other
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the agent system prompt
    Prompt,
    /// Manage workspace config (.orchestration/config.json)
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("TETHER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Nearest ancestor holding `.orchestration/`, else the working directory.
fn workspace_root() -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(TetherPaths::find_root(&cwd).unwrap_or(cwd))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.cmd {
        Command::Init => cmd_init::execute(&std::env::current_dir()?),
        Command::Intents { json } => cmd_intents::execute(&workspace_root()?, json),
        Command::Hash { path } => cmd_hash::execute(&workspace_root()?, &path),
        Command::Run => {
            let root = workspace_root()?;
            tokio::runtime::Runtime::new()?.block_on(cmd_run::execute(&root))
        }
        Command::Trace { cmd } => cmd_trace::run(cmd, &workspace_root()?),
        Command::Lesson { text, category } => {
            cmd_lesson::execute(&workspace_root()?, &text, category.as_deref())
        }
        Command::Prompt => cmd_prompt::execute(&workspace_root()?),
        Command::Config { cmd } => cmd_config::run(cmd, &workspace_root()?),
    }
}
