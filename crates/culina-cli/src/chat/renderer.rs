//! Terminal markdown rendering with syntax-highlighted code blocks and
//! mention styling.
//!
//! `ChatRenderer` combines `termimad` for prose and `syntect` for code
//! block syntax highlighting. During streaming, tokens are printed raw;
//! when a response arrives without having streamed (or when re-rendering
//! history), it is rendered as formatted markdown. `@[Recipe]` mentions
//! are styled so they stand out in the transcript.

use std::io::Write;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use termimad::MadSkin;

use culina_core::chat::mention::mention_spans;

/// Terminal markdown renderer with syntax highlighting.
pub struct ChatRenderer {
    skin: MadSkin,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl ChatRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);

        Self {
            skin,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Render a complete markdown response with syntax-highlighted code
    /// blocks.
    ///
    /// Code fences with a language tag are highlighted via syntect;
    /// everything else is rendered through termimad.
    pub fn render_final(&self, markdown: &str) -> String {
        let mut output = String::new();
        let mut in_code_block = false;
        let mut code_lang = String::new();
        let mut code_buf = String::new();

        for line in markdown.lines() {
            if line.starts_with("```") && !in_code_block {
                in_code_block = true;
                code_lang = line.trim_start_matches('`').trim().to_string();
                code_buf.clear();
            } else if line.starts_with("```") && in_code_block {
                in_code_block = false;
                output.push_str(&self.highlight_code(&code_buf, &code_lang));
                output.push('\n');
            } else if in_code_block {
                code_buf.push_str(line);
                code_buf.push('\n');
            } else {
                let rendered = self.skin.term_text(line);
                output.push_str(&format!("{rendered}"));
            }
        }

        // Handle unclosed code block
        if in_code_block && !code_buf.is_empty() {
            output.push_str(&self.highlight_code(&code_buf, &code_lang));
        }

        output
    }

    /// Print a single streaming token (raw, no formatting).
    pub fn print_streaming_token(&self, token: &str) {
        print!("{token}");
        let _ = std::io::stdout().flush();
    }

    /// Print the stats footer after an assistant response.
    pub fn print_stats_footer(&self, response_ms: u64, model: &str) {
        let seconds = response_ms as f64 / 1000.0;
        println!(
            "\n  {} {:.1}s {} {}",
            console::style("|").dim(),
            console::style(seconds).dim(),
            console::style("\u{00b7}").dim(),
            console::style(model).dim(),
        );
    }

    /// Highlight a code block using syntect.
    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = if lang.is_empty() {
            self.syntax_set.find_syntax_plain_text()
        } else {
            self.syntax_set
                .find_syntax_by_token(lang)
                .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
        };

        let theme = &self.theme_set.themes["base16-ocean.dark"];
        let mut h = HighlightLines::new(syntax, theme);

        let mut output = String::new();
        output.push_str(&format!(
            "  {}\n",
            console::style(format!("--- {lang} ---")).dim()
        ));

        for line in code.lines() {
            let ranges: Vec<(Style, &str)> =
                h.highlight_line(line, &self.syntax_set).unwrap_or_default();
            let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
            output.push_str(&format!("  {escaped}\x1b[0m\n"));
        }

        output
    }
}

/// Style every `@[Recipe]` mention in `text` so it stands out.
///
/// The transcript keeps mentions in their raw bracketed form; styling is a
/// separate pass over the display text.
pub fn highlight_mentions(text: &str) -> String {
    let spans = mention_spans(text);
    if spans.is_empty() {
        return text.to_string();
    }

    let mut result = String::new();
    let mut last_end = 0;
    for (start, end) in spans {
        result.push_str(&text[last_end..start]);
        result.push_str(&format!("{}", console::style(&text[start..end]).magenta().bold()));
        last_end = end;
    }
    result.push_str(&text[last_end..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_mentions_passthrough_without_mentions() {
        assert_eq!(highlight_mentions("plain text"), "plain text");
    }

    #[test]
    fn test_highlight_mentions_wraps_each_mention() {
        let styled = highlight_mentions("try @[Pasta Carbonara] tonight");
        assert!(styled.contains("@[Pasta Carbonara]"));
        assert!(styled.starts_with("try "));
        assert!(styled.ends_with(" tonight"));
    }

    #[test]
    fn test_render_final_plain_prose() {
        let renderer = ChatRenderer::new();
        let rendered = renderer.render_final("just a sentence");
        assert!(rendered.contains("just a sentence"));
    }
}
