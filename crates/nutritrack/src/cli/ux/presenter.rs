use console::{Style, StyledObject};
use nutritrack_core::completion::CompletionMetrics;
use nutritrack_core::transcript::Turn;

/// Longest turn text shown by [`format_transcript`].
const MAX_TURN_LENGTH: usize = 500;

/// Represents the type of a chat message, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMessageType {
    /// The prompt for user input.
    Prompt,
    /// Footer information, like metrics or status.
    Footer,
    /// An error message.
    Error,
}

/// Styles a string of text according to the specified `ChatMessageType`.
pub fn style_chat_text(text: &str, style: ChatMessageType) -> StyledObject<&str> {
    let style_obj = match style {
        ChatMessageType::Prompt => Style::new().blue().bold(),
        ChatMessageType::Footer => Style::new().white().dim(),
        ChatMessageType::Error => Style::new().red().bold(),
    };
    style_obj.apply_to(text)
}

/// Formats the completion metrics into a string for display in the footer.
pub fn format_footer_metrics(metrics: &CompletionMetrics, finish_reason: Option<&str>) -> String {
    let mut footer_complete = String::from("◼ Completed");
    if let Some(reason) = finish_reason {
        footer_complete.push_str(&format!(" ({reason})"));
    }
    footer_complete.push('.');

    let mut details = Vec::new();

    if metrics.prompt_eval_latency_ms > 0.0 {
        details.push(format!(
            "{:.2}s to first token",
            metrics.prompt_eval_latency_ms / 1000.0
        ));
    }
    if metrics.completion_latency_ms > 0.0 {
        details.push(format!(
            "{:.2}s total",
            (metrics.prompt_eval_latency_ms + metrics.completion_latency_ms) / 1000.0
        ));
    }

    if metrics.completion_tokens > 0 && metrics.completion_latency_ms > 0.0 {
        let tokens_per_sec =
            metrics.completion_tokens as f32 * 1000.0 / metrics.completion_latency_ms;
        details.push(format!("{tokens_per_sec:.2} tokens/s"));
    }

    if metrics.completion_tokens > 0 {
        details.push(format!("{} completion tokens", metrics.completion_tokens));
    }
    if metrics.prompt_tokens > 0 {
        details.push(format!("{} prompt tokens", metrics.prompt_tokens));
    }

    if details.is_empty() {
        footer_complete
    } else {
        format!("{} {}", footer_complete, details.join(". "))
    }
}

/// Formats every turn of a transcript, oldest first, with its display role.
pub fn format_transcript<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> String {
    let mut out = String::from("\n=== TRANSCRIPT ===\n");
    let mut first = true;
    for turn in turns {
        if !first {
            out.push_str("------\n");
        }
        first = false;

        let mut content = turn.text.clone();
        if content.len() > MAX_TURN_LENGTH {
            let mut cut = MAX_TURN_LENGTH;
            while !content.is_char_boundary(cut) {
                cut -= 1;
            }
            content.truncate(cut);
            content.push_str("\n... [truncated]");
        }
        out.push_str(&format!(
            "{}: {}\n",
            turn.speaker.display_role().to_uppercase(),
            content
        ));
    }
    out.push_str("==================\n");
    out
}
