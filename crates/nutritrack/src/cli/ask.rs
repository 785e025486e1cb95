use anyhow::{Context, Result};
use nutritrack_core::completion::Completion;
use nutritrack_core::config::Config;
use nutritrack_core::session::{ExchangeEvent, ExchangeOutcome};
use std::io::{Write, stderr, stdout};

use crate::{
    cli::ux::{ChatMessageType, format_footer_metrics, style_chat_text},
    svc::chat::Chat,
};

/// Executes the ask command: one exchange about `description`, reply on stdout.
pub async fn execute(description: Vec<String>, model: Option<String>, config: &Config) -> Result<()> {
    let mut chat = Chat::new(config, model).context("Failed to initialize chat service")?;
    let prompt = description.join(" ");

    eprintln!(
        "{}",
        style_chat_text("Analisando refeição...", ChatMessageType::Footer)
    );
    eprintln!();

    ask(&mut chat, &prompt, &mut stdout(), &mut stderr()).await
}

async fn ask(
    chat: &mut Chat<'_>,
    prompt: &str,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let outcome = chat
        .exchange(prompt, |event| {
            if let ExchangeEvent::Stream(Completion::Response(r)) = event {
                write!(out, "{}", r.text)?;
                out.flush()?;
            }
            Ok(())
        })
        .await?;

    match outcome {
        ExchangeOutcome::Ignored => {
            writeln!(err, "Nada para analisar.")?;
        }
        ExchangeOutcome::Replied(reply) => {
            writeln!(out)?;
            let footer = format_footer_metrics(&reply.metrics, reply.finish_reason.as_deref());
            writeln!(err)?;
            writeln!(err, "{}", style_chat_text(&footer, ChatMessageType::Footer))?;
        }
        ExchangeOutcome::Failed { error, shown } => {
            writeln!(out)?;
            writeln!(out, "{shown}")?;
            let detail = format!("{error:#}");
            writeln!(err, "{}", style_chat_text(&detail, ChatMessageType::Error))?;
        }
    }

    Ok(())
}
