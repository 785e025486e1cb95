//! NutriTrack cli definition and entrypoint.
mod ask;
mod chat;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod ux;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nutritrack_core::config::get_config;

use crate::log::setup_logging;

/// NutriTrack - analyze your meals with an AI nutrition assistant.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write debug logs to the data directory.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the nutrition assistant and keep a meal log.
    Chat {
        /// Model to use for chat, must be defined in the config.
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Analyze a single meal description and exit.
    Ask {
        /// What you ate.
        #[arg(required = true)]
        description: Vec<String>,
        /// Model to use, must be defined in the config.
        #[arg(short, long)]
        model: Option<String>,
    },
}

/// Runs the main CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        setup_logging().context("Failed to set up logging")?;
    }

    let config = get_config(None).context("Failed to load configuration")?;

    match cli.command {
        Commands::Chat { model } => chat::execute(model, &config).await,
        Commands::Ask { description, model } => ask::execute(description, model, &config).await,
    }
}
