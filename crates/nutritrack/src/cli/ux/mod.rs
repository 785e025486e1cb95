mod chart;
mod presenter;
mod progress;
mod render;

pub use chart::format_meal_summary;
pub use presenter::{ChatMessageType, format_footer_metrics, format_transcript, style_chat_text};
pub use progress::GenerationSpinner;
pub use render::{TerminalRenderer, get_theme};

use console::style;

/// Prints a formatted error message to stderr.
pub fn present_error(error: anyhow::Error) {
    let error_text = style("ERROR:").red().bold();
    eprintln!("\n{error_text} {error:#}");
}
