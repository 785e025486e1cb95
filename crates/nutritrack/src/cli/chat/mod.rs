use crate::cli::ux::{TerminalRenderer, get_theme};
use crate::svc::chat::Chat;
use anyhow::{Context, Result};
use nutritrack_core::config::Config;
use std::io::stdout;

mod commands;
mod compl;
mod repl;

/// Executes the chat command, starting an interactive REPL session.
pub async fn execute(model: Option<String>, config: &Config) -> Result<()> {
    let mut chat = Chat::new(config, model).context("Failed to initialize chat service")?;
    let theme = get_theme(&config.theme);
    let mut stdout = stdout();
    let mut renderer = TerminalRenderer::new(&mut stdout, &theme);
    repl::run(&mut chat, &mut renderer).await
}
