use anyhow::Result;
use once_cell::sync::Lazy;
use std::io::Write;
use syntect::{
    easy::HighlightLines,
    highlighting::{Style as SyntectStyle, Theme, ThemeSet},
    parsing::SyntaxSet,
    util::{LinesWithEndings, as_24_bit_terminal_escaped},
};

const RESET: &str = "\x1b[0m";

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Returns the highlighting theme for the configured `theme_name`.
pub fn get_theme(theme_name: &str) -> Theme {
    let theme_key = match theme_name {
        "dark" => "base16-ocean.dark",
        _ => "InspiredGitHub",
    };
    ThemeSet::load_defaults()
        .themes
        .remove(theme_key)
        .unwrap_or_default()
}

/// Writes streamed markdown to a terminal.
///
/// Fragments rarely end on a line boundary, so text is held back until its line completes and
/// then highlighted as a whole line. [`TerminalRenderer::finish`] writes whatever is left.
pub struct TerminalRenderer<'a> {
    out: &'a mut dyn Write,
    theme: Option<&'a Theme>,
    highlighter: Option<HighlightLines<'a>>,
    pending: String,
}

impl<'a> TerminalRenderer<'a> {
    pub fn new(out: &'a mut dyn Write, theme: &'a Theme) -> Self {
        let mut renderer = Self::plain(out);
        renderer.theme = Some(theme);
        renderer.clear();
        renderer
    }

    /// A renderer without highlighting. Text is written as received.
    pub fn plain(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            theme: None,
            highlighter: None,
            pending: String::new(),
        }
    }

    /// Resets the highlighter state for a new reply.
    pub fn clear(&mut self) {
        self.pending.clear();
        if let Some(theme) = self.theme {
            let syntax = SYNTAX_SET
                .find_syntax_by_extension("md")
                .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
            self.highlighter = Some(HighlightLines::new(syntax, theme));
        }
    }

    pub fn render_markdown(&mut self, text: &str) -> Result<()> {
        if self.highlighter.is_none() {
            self.out.write_all(text.as_bytes())?;
            self.out.flush()?;
            return Ok(());
        }

        self.pending.push_str(text);
        let Some(last_newline) = self.pending.rfind('\n') else {
            return Ok(());
        };
        let complete: String = self.pending.drain(..=last_newline).collect();
        for line in LinesWithEndings::from(&complete) {
            self.write_highlighted(line)?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Writes any partial line held back and ends the reply on a fresh line.
    pub fn finish(&mut self) -> Result<()> {
        if self.highlighter.is_some() {
            let mut rest = std::mem::take(&mut self.pending);
            if !rest.is_empty() {
                rest.push('\n');
                self.write_highlighted(&rest)?;
            }
        } else {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_highlighted(&mut self, line: &str) -> Result<()> {
        let Some(highlighter) = self.highlighter.as_mut() else {
            self.out.write_all(line.as_bytes())?;
            return Ok(());
        };
        let ranges = highlighter
            .highlight_line(line, &SYNTAX_SET)
            .unwrap_or_else(|_| vec![(SyntectStyle::default(), line)]);
        let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
        self.out.write_all(escaped.as_bytes())?;
        // The escaped text never resets the color
        self.out.write_all(RESET.as_bytes())?;
        Ok(())
    }
}
