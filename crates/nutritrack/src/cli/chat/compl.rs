use crate::cli::chat::commands::{CliCommand, Command, parse_command_line};
use crate::cli::ux::{ChatMessageType, style_chat_text};
use clap::Parser;
use rustyline::completion::{Candidate, Completer};
use rustyline::error::ReadlineError;
use rustyline::hint::Hinter;
use rustyline::{Helper, Highlighter, Validator};

const MEAL_ACTIONS: [&str; 3] = ["add", "list", "summary"];

/// Completion candidate for the REPL.
#[derive(Debug)]
pub struct CompletionCandidate {
    text: String,
    display_string: String,
}

impl CompletionCandidate {
    pub fn new(text: &str) -> Self {
        let display_string = style_chat_text(text, ChatMessageType::Footer).to_string();
        Self {
            text: text.to_owned(),
            display_string,
        }
    }
}

impl Candidate for CompletionCandidate {
    fn display(&self) -> &str {
        &self.display_string
    }

    fn replacement(&self) -> &str {
        &self.text
    }
}

/// REPL runtime state for command line editing.
#[derive(Helper, Validator, Highlighter)]
pub struct Repl {
    pub command_names: Vec<String>,
    pub model_names: Vec<String>,
    pub slot_names: Vec<String>,
}

impl Completer for Repl {
    type Candidate = CompletionCandidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Self::Candidate>), ReadlineError> {
        if !line.starts_with('/') {
            return Ok((0, Vec::new()));
        }

        // `/meal` alone does not parse, it needs an action
        let line_to_pos = &line[..pos];
        if line_to_pos.starts_with("/meal ") {
            return Ok(meal_compl(line_to_pos, &self.slot_names));
        }

        let args = parse_command_line(line);
        if let Ok(cli_command) = CliCommand::try_parse_from(&args) {
            return match cli_command.command {
                Command::Model { .. } => Ok(model_compl(line_to_pos, &self.model_names)),
                _ => Ok((0, Vec::new())),
            };
        }

        let candidates = self
            .command_names
            .iter()
            .filter(|name| name.starts_with(line))
            .map(|name| CompletionCandidate::new(name))
            .collect();

        Ok((0, candidates))
    }
}

impl Hinter for Repl {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if line.is_empty() || pos < line.len() {
            return None;
        }
        if line.starts_with('/') {
            self.command_names
                .iter()
                .find(|&cmd_name| cmd_name.starts_with(line))
                .map(|cmd_name| cmd_name[line.len()..].into())
        } else {
            None
        }
    }
}

/// Completes the word under the cursor from `names`.
fn word_compl<'a>(
    line_to_pos: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> (usize, Vec<CompletionCandidate>) {
    let Some(space_pos) = line_to_pos.rfind(' ') else {
        return (0, Vec::new());
    };
    let prefix_start = space_pos + 1;
    let prefix = &line_to_pos[prefix_start..];
    let candidates = names
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .map(CompletionCandidate::new)
        .collect();
    (prefix_start, candidates)
}

fn model_compl(line_to_pos: &str, model_names: &[String]) -> (usize, Vec<CompletionCandidate>) {
    let mut names: Vec<&str> = model_names.iter().map(String::as_str).collect();
    if !names.contains(&"list") {
        names.push("list");
    }
    word_compl(line_to_pos, names)
}

/// Completes the action of `/meal` and the slot of `/meal add`.
fn meal_compl(line_to_pos: &str, slot_names: &[String]) -> (usize, Vec<CompletionCandidate>) {
    let words: Vec<&str> = line_to_pos.split_whitespace().collect();
    let word_index = if line_to_pos.ends_with(' ') {
        words.len()
    } else {
        words.len().saturating_sub(1)
    };

    match word_index {
        1 => word_compl(line_to_pos, MEAL_ACTIONS),
        2 if words.get(1) == Some(&"add") => {
            word_compl(line_to_pos, slot_names.iter().map(String::as_str))
        }
        _ => (0, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::DefaultHistory;

    fn repl() -> Repl {
        Repl {
            command_names: vec!["/log".to_string(), "/meal".to_string(), "/model".to_string()],
            model_names: vec!["gemini-flash".to_string(), "gpt-4o-mini".to_string()],
            slot_names: vec!["breakfast".to_string(), "lunch".to_string(), "snack".to_string()],
        }
    }

    fn complete(repl: &Repl, line: &str) -> (usize, Vec<String>) {
        let history = DefaultHistory::new();
        let (start, candidates) = repl
            .complete(line, line.len(), &rustyline::Context::new(&history))
            .unwrap();
        let names = candidates
            .iter()
            .map(|c| c.replacement().to_string())
            .collect();
        (start, names)
    }

    #[test]
    fn test_repl_completer_for_commands() {
        assert_eq!(complete(&repl(), "/me"), (0, vec!["/meal".into()]));
        assert_eq!(complete(&repl(), "/mo"), (0, vec!["/model".into()]));
        assert_eq!(complete(&repl(), "/l"), (0, vec!["/log".into()]));
        assert_eq!(complete(&repl(), "Arroz"), (0, vec![]));
    }

    #[test]
    fn test_model_command_completion() {
        let (start, names) = complete(&repl(), "/model g");
        assert_eq!(start, 7); // "/model ".len()
        assert_eq!(names, ["gemini-flash", "gpt-4o-mini"]);

        let (_, names) = complete(&repl(), "/model ");
        assert_eq!(names, ["gemini-flash", "gpt-4o-mini", "list"]);
    }

    #[test]
    fn test_meal_command_completion() {
        let (start, names) = complete(&repl(), "/meal a");
        assert_eq!(start, 6);
        assert_eq!(names, ["add"]);

        let (start, names) = complete(&repl(), "/meal add ");
        assert_eq!(start, 10);
        assert_eq!(names, ["breakfast", "lunch", "snack"]);

        let (_, names) = complete(&repl(), "/meal add s");
        assert_eq!(names, ["snack"]);

        let (_, names) = complete(&repl(), "/meal add lunch 5");
        assert!(names.is_empty());
    }

    #[test]
    fn test_repl_hinter() {
        let repl = repl();
        let history = DefaultHistory::new();
        let ctx = rustyline::Context::new(&history);

        assert_eq!(repl.hint("/lo", 3, &ctx).unwrap(), "g");
        assert!(repl.hint("abc", 3, &ctx).is_none());
        assert!(repl.hint("/log", 2, &ctx).is_none());
        assert!(repl.hint("", 0, &ctx).is_none());
    }
}
