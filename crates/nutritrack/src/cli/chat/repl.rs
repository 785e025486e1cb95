use crate::cli::chat::commands::{CliCommand, parse_command_line};
use crate::cli::chat::compl::Repl;
use crate::cli::ux::{
    ChatMessageType, GenerationSpinner, TerminalRenderer, format_footer_metrics, style_chat_text,
};
use crate::svc::chat::Chat;
use anyhow::Result;
use clap::{CommandFactory, Parser};
use nutritrack_core::completion::Completion;
use nutritrack_core::meal::MealSlot;
use nutritrack_core::session::{ExchangeEvent, ExchangeOutcome};
use rustyline::error::ReadlineError;
use rustyline::{CompletionType, Editor};
use std::io::stdout;
use tracing::debug;

const BUSY_MESSAGE: &str = "Analisando refeição e gerando tabela nutricional...";

pub async fn run(chat: &mut Chat<'_>, renderer: &mut TerminalRenderer<'_>) -> Result<()> {
    println!("Bem-vindo ao NutriTrack! Digite '/help' para ver os comandos e '/q' para sair.");

    let config = rustyline::Config::builder()
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let command_names = CliCommand::command()
        .get_subcommands()
        .flat_map(|c| c.get_name_and_visible_aliases())
        .map(|s| format!("/{s}"))
        .collect::<Vec<_>>();
    let model_names = chat
        .available_model_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let slot_names = MealSlot::ALL.iter().map(|s| s.to_string()).collect();

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(Repl {
        command_names,
        model_names,
        slot_names,
    }));

    // Greeting
    for turn in chat.transcript() {
        renderer.clear();
        renderer.render_markdown(&turn.text)?;
        renderer.finish()?;
    }

    loop {
        let prompt_meta = format!("[modelo: {}]", chat.model_name());
        let prompt = format!(
            "\n{}\n{}",
            style_chat_text(&prompt_meta, ChatMessageType::Prompt),
            style_chat_text("> ", ChatMessageType::Prompt)
        );
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(&line)?;
                let trimmed_line = line.trim();

                if trimmed_line.is_empty() {
                    continue;
                }

                if trimmed_line.starts_with('/') {
                    let args = parse_command_line(trimmed_line);
                    match CliCommand::try_parse_from(args) {
                        Ok(cli_command) => {
                            if !cli_command.command.execute(chat, &mut stdout())? {
                                return Ok(());
                            }
                        }
                        Err(e) => {
                            e.print()?;
                        }
                    }
                } else {
                    process_message(chat, renderer, trimmed_line).await?;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Digite /quit para sair.");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nAté logo!");
                return Ok(());
            }
            Err(err) => {
                return Err(err.into());
            }
        }
    }
}

/// Sends `prompt` and streams the reply to `renderer`. Backend failures are shown, not returned.
async fn process_message(
    chat: &mut Chat<'_>,
    renderer: &mut TerminalRenderer<'_>,
    prompt: &str,
) -> Result<()> {
    renderer.clear();

    let mut spinner: Option<GenerationSpinner> = None;
    let outcome = chat
        .exchange(prompt, |event| {
            match event {
                ExchangeEvent::UserTurn(_) => {
                    spinner = Some(GenerationSpinner::new(BUSY_MESSAGE.to_string()));
                }
                ExchangeEvent::Stream(completion) => {
                    if let Some(spinner) = spinner.take() {
                        spinner.clear();
                    }
                    if let Completion::Response(chunk) = completion
                        && !chunk.text.is_empty()
                    {
                        renderer.render_markdown(&chunk.text)?;
                    }
                }
            }
            Ok(())
        })
        .await?;

    if let Some(spinner) = spinner.take() {
        spinner.clear();
    }

    match outcome {
        ExchangeOutcome::Ignored => {}
        ExchangeOutcome::Replied(reply) => {
            renderer.finish()?;
            let footer = format_footer_metrics(&reply.metrics, reply.finish_reason.as_deref());
            println!();
            println!("{}", style_chat_text(&footer, ChatMessageType::Footer));
        }
        ExchangeOutcome::Failed { error, shown } => {
            renderer.finish()?;
            debug!(error = %error, "Reply failed");
            println!("{}", style_chat_text(&shown, ChatMessageType::Error));
            let detail = format!("{error:#}");
            println!("{}", style_chat_text(&detail, ChatMessageType::Footer));
        }
    }
    Ok(())
}
