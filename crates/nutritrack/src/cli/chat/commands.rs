use crate::cli::ux::{ChatMessageType, format_meal_summary, format_transcript, style_chat_text};
use crate::svc::chat::Chat;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use nutritrack_core::meal::MealSlot;
use std::io::Write;

// -------------
// REPL commands
// -------------
#[derive(Parser, Debug)]
#[command(multicall = true)]
pub struct CliCommand {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the whole conversation
    Log {
        /// Print the transcript as JSON records
        #[arg(long)]
        json: bool,
    },
    /// Manage chat models.
    ///
    /// With no arguments or "list", shows the current model and available models.
    #[command(alias = "m")]
    Model {
        /// Model name to switch to
        name: Option<String>,
    },
    /// Log meals and show the calories of a day
    Meal {
        #[command(subcommand)]
        action: MealCommand,
    },
    /// Exit the chat session
    #[command(alias = "q", alias = "quit")]
    Exit,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum MealCommand {
    /// Log a meal, e.g. `/meal add lunch 650 Arroz, feijão e salada`
    Add {
        /// breakfast, lunch, dinner, snack or other
        slot: MealSlot,
        /// Calories of the meal in kcal
        calories: u32,
        /// What was eaten
        #[arg(required = true)]
        description: Vec<String>,
        /// Day of the meal (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List the meals of a day
    List {
        /// Day to list (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the calories of a day by meal
    Summary {
        /// Day to summarize (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn day_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

impl Command {
    /// Executes a REPL command, writing its output to `out`.
    ///
    /// Returns `Ok(false)` if the REPL should exit.
    pub fn execute(self, chat: &mut Chat<'_>, out: &mut dyn Write) -> Result<bool> {
        match self {
            Command::Log { json } => execute_log(chat, json, out),
            Command::Model { name } => execute_model(chat, name.as_deref(), out),
            Command::Meal { action } => execute_meal(chat, action, out),
            Command::Exit => {
                writeln!(out, "Até logo!")?;
                Ok(false)
            }
        }
    }
}

fn execute_log(chat: &Chat<'_>, json: bool, out: &mut dyn Write) -> Result<bool> {
    if json {
        let records = chat.transcript().to_records();
        let text =
            serde_json::to_string_pretty(&records).context("Failed to serialize transcript")?;
        writeln!(out, "{text}")?;
    } else {
        write!(out, "{}", format_transcript(chat.transcript()))?;
    }
    Ok(true)
}

fn execute_model(chat: &mut Chat<'_>, name: Option<&str>, out: &mut dyn Write) -> Result<bool> {
    match name {
        Some(name) if name != "list" => match chat.set_model(name) {
            Ok(()) => writeln!(out, "Modelo alterado para: {}", chat.model_name())?,
            Err(e) => {
                let error_msg = format!("Erro ao trocar de modelo: {e:#}");
                writeln!(out, "{}", style_chat_text(&error_msg, ChatMessageType::Error))?;
            }
        },
        _ => {
            writeln!(out, "Modelo atual: {}", chat.model_name())?;
            let model_names = chat.available_model_names();
            if !model_names.is_empty() {
                writeln!(out, "Modelos disponíveis: {}", model_names.join(", "))?;
            }
        }
    }
    Ok(true)
}

fn execute_meal(chat: &mut Chat<'_>, action: MealCommand, out: &mut dyn Write) -> Result<bool> {
    match action {
        MealCommand::Add {
            slot,
            calories,
            description,
            date,
        } => {
            let date = day_or_today(date);
            let description = description.join(" ");
            if chat.add_meal(date, slot, &description, calories) {
                writeln!(
                    out,
                    "Registrado: {} em {date}: {} ({calories} kcal)",
                    slot.label(),
                    description.trim()
                )?;
            } else {
                let error_msg = "A descrição da refeição não pode ficar vazia.";
                writeln!(out, "{}", style_chat_text(error_msg, ChatMessageType::Error))?;
            }
        }
        MealCommand::List { date } => {
            let date = day_or_today(date);
            let entries = chat.meals_on(date);
            if entries.is_empty() {
                writeln!(out, "Nenhuma refeição registrada em {date}.")?;
            }
            for entry in entries {
                writeln!(
                    out,
                    "- {}: {} ({} kcal)",
                    entry.slot.label(),
                    entry.description,
                    entry.calories
                )?;
            }
        }
        MealCommand::Summary { date } => {
            let summary = chat.meal_summary(day_or_today(date));
            write!(out, "{}", format_meal_summary(&summary))?;
            if summary.is_empty() {
                writeln!(out)?;
            }
        }
    }
    Ok(true)
}

/// Splits a REPL line into arguments. Falls back to whitespace splitting when the line has
/// unbalanced quotes, e.g. an apostrophe in a meal description.
pub fn parse_command_line(line: &str) -> Vec<String> {
    let trimmed_line = line.trim();
    shlex::split(trimmed_line).unwrap_or_else(|| {
        trimmed_line
            .split_whitespace()
            .map(|s| s.to_string())
            .collect()
    })
}
