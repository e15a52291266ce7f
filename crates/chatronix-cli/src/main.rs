//! Chatronix CLI - anonymous chat from the terminal
//!
//! Signs in anonymously, follows the live message list and falls back to the
//! local cache while offline.

mod cli;
mod commands;
mod device;
mod error;
mod paths;
mod render;

use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::{chat, config, history, start, AppContext};
use crate::error::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::from_default_env();
    let filter = match "chatronix=info".parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let context = AppContext::resolve(cli.config.clone(), cli.data_dir.clone(), cli.offline)?;

    match cli.command {
        Commands::Start { name, color, grant } => {
            start::run_start(&context, &name, color.as_deref(), &grant).await?;
        }
        Commands::Chat {
            user_id,
            name,
            color,
            grant,
        } => {
            chat::run_chat_command(&context, user_id, name, color.as_deref(), &grant).await?;
        }
        Commands::History { json } => history::run_history(&context, json).await?,
        Commands::Config { command } => config::run_config(&context, command)?,
    }

    Ok(())
}
