//! Lingo CLI - Main entry point

mod cli;
mod tasks;

use clap::{Parser, Subcommand};
use lingo_foundation::LingoConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Lingo - lesson-authoring agent for language courses
#[derive(Parser, Debug)]
#[command(name = "lingo")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Extra TOML config file (applied after global/project config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one task in-process and print its progress
    Run {
        /// Task description for the agent
        prompt: String,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Iteration limit
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Workspace root for file tools
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Start the HTTP/SSE server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
    /// Inspect stored tasks
    Tasks {
        #[command(subcommand)]
        action: TasksCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum TasksCommand {
    /// List tasks, newest first
    List,
    /// Show one task with its events
    Show { id: String },
    /// Delete a task record
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = LingoConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Run {
            prompt,
            model,
            max_iterations,
            workspace,
        } => {
            if let Some(model) = model {
                config.agent.model = model;
            }
            if let Some(max) = max_iterations {
                config.agent.max_iterations = max;
            }
            if let Some(workspace) = workspace {
                config.tools.workspace_root = Some(workspace);
            }

            let success = cli::run_once(&config, &prompt).await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            lingo_server::start_server(config).await
        }
        Command::Tasks { action } => tasks::handle(&config, action),
    }
}
