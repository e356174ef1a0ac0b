mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use stockroom::config::AgentConfig;

#[derive(Parser)]
#[command(
    name = "stockroom",
    version,
    about = "Chat with an LLM about a local customer and inventory database"
)]
struct Cli {
    /// Config file (defaults to ./stockroom.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the interactive chat loop (default)
    Chat,
    /// Run database maintenance actions without starting a chat
    Db(cli::db_tool::DbArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AgentConfig::load_from(path)?,
        None => AgentConfig::load()?,
    };

    // Log to stderr so stdout carries only the conversation.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => cli::chat::run(&config).await?,
        Command::Db(args) => cli::db_tool::run(&config, &args)?,
    }

    Ok(())
}
