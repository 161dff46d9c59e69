use crate::HighlightArgs;
use crate::commands::text_or_stdin;
use crate::output::print_json;
use anyhow::{Context, Result};
use crossterm::style::{Attribute, Color as TermColor, ContentStyle, StyledContent};
use promptline_core::EditorConfig;
use promptline_ui::{MarkdownLexer, StyledSpan, Theme};
use ratatui::style::{Color, Modifier, Style};
use serde_json::json;
use std::fs;
use std::io::IsTerminal;

pub(crate) fn run_highlight(cfg: &EditorConfig, args: HighlightArgs, json_mode: bool) -> Result<()> {
    let text = match &args.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => text_or_stdin(None)?,
    };
    let lexer = if args.plain {
        MarkdownLexer::plain()
    } else {
        MarkdownLexer::from_config(&cfg.markdown)
    };
    let lexed = lexer.lex_text(text.strip_suffix('\n').unwrap_or(&text));

    if json_mode {
        let lines: Vec<Vec<serde_json::Value>> = lexed
            .lines()
            .iter()
            .map(|spans| {
                spans
                    .iter()
                    .map(|span| json!({"style": span.style, "text": span.text}))
                    .collect()
            })
            .collect();
        let state = lexed.final_state();
        print_json(&json!({
            "lines": lines,
            "state": {
                "in_fence": state.in_fence,
                "fence_language": state.fence_language,
                "in_math_block": state.in_math_block,
            },
        }))?;
        return Ok(());
    }

    let colored = std::io::stdout().is_terminal();
    let theme = Theme::from_config(&cfg.theme);
    for spans in lexed.lines() {
        println!("{}", render_line(&theme, spans, colored));
    }
    Ok(())
}

fn render_line(theme: &Theme, spans: &[StyledSpan], colored: bool) -> String {
    if !colored {
        return spans.iter().map(|span| span.text.as_str()).collect();
    }
    spans
        .iter()
        .map(|span| {
            let style = terminal_style(theme.style_for(&span.style));
            StyledContent::new(style, span.text.as_str()).to_string()
        })
        .collect()
}

fn terminal_style(style: Style) -> ContentStyle {
    let mut out = ContentStyle::new();
    out.foreground_color = style.fg.and_then(terminal_color);
    if style.add_modifier.contains(Modifier::BOLD) {
        out.attributes.set(Attribute::Bold);
    }
    if style.add_modifier.contains(Modifier::ITALIC) {
        out.attributes.set(Attribute::Italic);
    }
    out
}

fn terminal_color(color: Color) -> Option<TermColor> {
    let mapped = match color {
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
        Color::Reset => return None,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptline_ui::markdown::style;

    #[test]
    fn uncolored_output_is_the_source_line() {
        let spans = vec![
            StyledSpan::new(style::TEXT, "a "),
            StyledSpan::new(style::STRONG, "**b**"),
        ];
        assert_eq!(render_line(&Theme::default(), &spans, false), "a **b**");
    }

    #[test]
    fn colored_output_wraps_spans_in_escapes() {
        let spans = vec![StyledSpan::new(style::HEADING, "# T")];
        let rendered = render_line(&Theme::default(), &spans, true);
        assert!(rendered.contains("# T"));
        assert!(rendered.starts_with('\x1b'));
    }

    #[test]
    fn ratatui_colors_map_to_terminal_colors() {
        assert_eq!(terminal_color(Color::Cyan), Some(TermColor::DarkCyan));
        assert_eq!(terminal_color(Color::Reset), None);
        let style = terminal_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD));
        assert_eq!(style.foreground_color, Some(TermColor::DarkGreen));
        assert!(style.attributes.has(Attribute::Bold));
    }
}
