use crate::markdown::{StyledSpan, style};
use promptline_core::ThemeConfig;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Accepts the sixteen ANSI names (`light-blue`, `Light Blue` and
/// `lightblue` are the same), `#rrggbb`, `rgb(r, g, b)` and a 256-colour
/// palette index.
fn parse_theme_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lowered = value.to_ascii_lowercase();
    if let Some(inner) = lowered
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>().ok())
            .collect::<Option<Vec<_>>>()?;
        return match parts.as_slice() {
            [r, g, b] => Some(Color::Rgb(*r, *g, *b)),
            _ => None,
        };
    }
    if let Ok(index) = lowered.parse::<u8>() {
        return Some(Color::Indexed(index));
    }
    let name: String = lowered
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect();
    let color = match name.as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => return None,
    };
    Some(color)
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Configured colour, or `fallback` with a warning when it does not parse.
fn theme_color(field: &'static str, value: &str, fallback: Color) -> Color {
    parse_theme_color(value).unwrap_or_else(|| {
        tracing::warn!(field, value, "unknown theme colour; using default");
        fallback
    })
}

/// Maps span style tags to terminal styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color::Cyan,
            secondary: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl Theme {
    /// Unrecognised colours fall back to the default for that slot.
    pub fn from_config(cfg: &ThemeConfig) -> Self {
        let defaults = Self::default();
        Self {
            primary: theme_color("primary", &cfg.primary, defaults.primary),
            secondary: theme_color("secondary", &cfg.secondary, defaults.secondary),
            error: theme_color("error", &cfg.error, defaults.error),
        }
    }

    /// Style for a tag. Composite tags such as `md.code.block syntax.string`
    /// layer each part over the previous one.
    pub fn style_for(&self, tag: &str) -> Style {
        tag.split_whitespace()
            .fold(Style::default(), |acc, part| acc.patch(self.base_style(part)))
    }

    pub fn to_line(&self, spans: &[StyledSpan]) -> Line<'static> {
        Line::from(
            spans
                .iter()
                .map(|span| Span::styled(span.text.clone(), self.style_for(&span.style)))
                .collect::<Vec<_>>(),
        )
    }

    fn base_style(&self, tag: &str) -> Style {
        let plain = Style::default();
        match tag {
            style::HEADING => plain.fg(self.primary).add_modifier(Modifier::BOLD),
            style::RULE | style::FENCE | style::TABLE_PIPE => plain.fg(Color::DarkGray),
            style::QUOTE => plain.fg(Color::Gray).add_modifier(Modifier::ITALIC),
            style::LIST_MARKER | style::TASK_UNCHECKED => plain.fg(self.secondary),
            style::TASK_CHECKED => plain.fg(Color::Green),
            style::CODE_BLOCK => plain.fg(Color::Gray),
            style::CODE_INLINE => plain.fg(self.secondary),
            style::MATH_DELIM | style::MATH_BLOCK | style::MATH_INLINE => {
                plain.fg(Color::Magenta)
            }
            style::STRONG => plain.add_modifier(Modifier::BOLD),
            style::EMPHASIS => plain.add_modifier(Modifier::ITALIC),
            "syntax.keyword" | "syntax.storage" => plain.fg(self.primary),
            "syntax.string" => plain.fg(Color::Green),
            "syntax.comment" => plain.fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            "syntax.constant" => plain.fg(Color::LightMagenta),
            "syntax.entity" | "syntax.support" => plain.fg(Color::LightBlue),
            "syntax.invalid" => plain.fg(self.error),
            _ => plain,
        }
    }
}
