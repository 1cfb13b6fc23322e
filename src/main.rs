//! Showroom - dealership chat assistant
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use showroom::tools::dealership::{Dealership, Inventory};
use showroom::{Agent, Config, Repl};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Showroom - dealership chat assistant
#[derive(Parser, Debug)]
#[command(name = "showroom")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model identifier sent to the endpoint
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Base URL of the chat completions endpoint
    #[arg(long, short = 'e')]
    endpoint: Option<String>,

    /// Config file (defaults to ~/.config/showroom/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Maximum model calls per message
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Inventory JSON file (defaults to a built-in sample)
    #[arg(long, short = 'i')]
    inventory: Option<PathBuf>,

    /// Session identifier passed to tool handlers
    #[arg(long, short = 's')]
    session: Option<String>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Single prompt mode (non-interactive)
    #[arg(long, short = 'p')]
    prompt: Option<String>,
}

fn init_logging(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();

    // Build configuration
    let mut config = match args.config {
        Some(ref path) => Config::load_from_path(path)?.with_env_overrides(),
        None => Config::load(),
    };

    init_logging(args.verbose, config.logging.json);

    // Apply CLI overrides
    if let Some(model) = args.model {
        config.gateway.model = model;
    }
    if let Some(endpoint) = args.endpoint {
        config.gateway.base_url = endpoint;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.agent.max_iterations = max_iterations;
    }

    let inventory = match args.inventory {
        Some(ref path) => Inventory::load(path)?,
        None => Inventory::sample(),
    };
    let dealership = Dealership::new(inventory);
    let executor = dealership.toolset(Duration::from_secs(config.agent.tool_timeout_secs))?;

    let session = args
        .session
        .unwrap_or_else(|| format!("cli-{}", Uuid::new_v4().simple()));
    info!(session = %session, model = %config.gateway.model, "starting session");

    let agent = Agent::from_config(config, executor, session)?;
    let mut repl = Repl::new(agent, dealership);

    // Single prompt mode
    if let Some(prompt) = args.prompt {
        let reply = repl.respond(&prompt).await;
        if reply.outcome.is_failed() {
            std::process::exit(1);
        }
        return Ok(());
    }

    // Interactive REPL mode
    repl.run().await?;

    Ok(())
}
