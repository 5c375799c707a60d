mod cli;
mod commands;
mod completions;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr: stdout carries the MCP protocol.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Completions { shell }) => {
            completions::generate_completions(shell);
            Ok(())
        }
        Some(Commands::Chatflows) => commands::chatflows::run(cli.format).await,
        Some(Commands::Serve) | None => commands::serve::run().await,
    }
}
