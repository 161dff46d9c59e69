//! Line-oriented markdown highlighting for the prompt buffer.
//!
//! This is a highlighter, not a parser: each line is classified on its own,
//! with only fence and `$$` math-block state carried from one line to the
//! next. The spans of a line always concatenate back to the line.

pub mod sublexer;

use promptline_core::{Document, MarkdownConfig};
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub use sublexer::{PlainLexer, PlainRegistry, SubLexer, SubLexerRegistry, SyntectRegistry};

/// Style tags attached to spans. Code tokens combine [`CODE_BLOCK`] with a
/// `syntax.*` class, separated by a space.
pub mod style {
    pub const TEXT: &str = "md.text";
    pub const HEADING: &str = "md.heading";
    pub const RULE: &str = "md.hr";
    pub const QUOTE: &str = "md.quote";
    pub const LIST_INDENT: &str = "md.list.indent";
    pub const LIST_MARKER: &str = "md.list.marker";
    pub const TASK_CHECKED: &str = "md.task.checked";
    pub const TASK_UNCHECKED: &str = "md.task.unchecked";
    pub const TABLE_PIPE: &str = "md.table.pipe";
    pub const FENCE: &str = "md.fence";
    pub const CODE_BLOCK: &str = "md.code.block";
    pub const CODE_INLINE: &str = "md.code.inline";
    pub const MATH_DELIM: &str = "md.math.delim";
    pub const MATH_BLOCK: &str = "md.math.block";
    pub const MATH_INLINE: &str = "md.math.inline";
    pub const STRONG: &str = "md.strong";
    pub const EMPHASIS: &str = "md.emph";
}

const MATH_DELIMITER: &str = "$$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub style: String,
    pub text: String,
}

impl StyledSpan {
    pub fn new(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            text: text.into(),
        }
    }
}

/// Block state carried from line to line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexState {
    pub in_fence: bool,
    pub fence_language: Option<String>,
    pub in_math_block: bool,
}

/// Spans for every line of one document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexedDocument {
    lines: Vec<Vec<StyledSpan>>,
    final_state: LexState,
}

impl LexedDocument {
    /// Spans for line `index`; an empty text span past the end.
    pub fn line(&self, index: usize) -> Vec<StyledSpan> {
        self.lines
            .get(index)
            .cloned()
            .unwrap_or_else(|| vec![StyledSpan::new(style::TEXT, "")])
    }

    pub fn lines(&self) -> &[Vec<StyledSpan>] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// State after the last line, e.g. `in_fence` for an unterminated fence.
    pub fn final_state(&self) -> &LexState {
        &self.final_state
    }
}

#[derive(Clone)]
pub struct MarkdownLexer {
    registry: Arc<dyn SubLexerRegistry>,
}

impl Default for MarkdownLexer {
    fn default() -> Self {
        Self::plain()
    }
}

impl MarkdownLexer {
    pub fn new(registry: Arc<dyn SubLexerRegistry>) -> Self {
        Self { registry }
    }

    /// Fenced code is styled as one block, without language tokens.
    pub fn plain() -> Self {
        Self::new(Arc::new(PlainRegistry))
    }

    pub fn highlighted() -> Self {
        Self::new(SyntectRegistry::shared())
    }

    pub fn from_config(cfg: &MarkdownConfig) -> Self {
        if cfg.syntax_highlighting {
            Self::highlighted()
        } else {
            Self::plain()
        }
    }

    pub fn lex_document(&self, doc: &Document) -> LexedDocument {
        self.lex(&doc.lines())
    }

    pub fn lex_text(&self, text: &str) -> LexedDocument {
        let lines: Vec<&str> = text.split('\n').collect();
        self.lex(&lines)
    }

    pub fn lex(&self, lines: &[&str]) -> LexedDocument {
        let mut state = LexState::default();
        let mut code_lexer: Option<Box<dyn SubLexer + '_>> = None;
        let mut out = Vec::with_capacity(lines.len());

        for line in lines {
            let trimmed = line.trim();
            if trimmed.starts_with("```") {
                if state.in_fence {
                    state.in_fence = false;
                    state.fence_language = None;
                    code_lexer = None;
                } else {
                    let language = trimmed
                        .trim_start_matches('`')
                        .split_whitespace()
                        .next()
                        .unwrap_or_default();
                    state.in_fence = true;
                    state.fence_language = (!language.is_empty()).then(|| language.to_string());
                    code_lexer = Some(self.registry.resolve(language));
                }
                out.push(vec![StyledSpan::new(style::FENCE, *line)]);
                continue;
            }
            if state.in_fence {
                out.push(code_spans(code_lexer.as_deref_mut(), line));
                continue;
            }
            if trimmed == MATH_DELIMITER {
                state.in_math_block = !state.in_math_block;
                out.push(vec![StyledSpan::new(style::MATH_DELIM, *line)]);
                continue;
            }
            if state.in_math_block || is_single_line_math(trimmed) {
                out.push(vec![StyledSpan::new(style::MATH_BLOCK, *line)]);
                continue;
            }
            out.push(lex_block_line(line));
        }

        LexedDocument {
            lines: out,
            final_state: state,
        }
    }
}

fn is_single_line_math(trimmed: &str) -> bool {
    trimmed.len() > 2 * MATH_DELIMITER.len()
        && trimmed.starts_with(MATH_DELIMITER)
        && trimmed.ends_with(MATH_DELIMITER)
        && !trimmed[MATH_DELIMITER.len()..trimmed.len() - MATH_DELIMITER.len()]
            .trim()
            .is_empty()
}

fn code_spans(lexer: Option<&mut (dyn SubLexer + '_)>, line: &str) -> Vec<StyledSpan> {
    let plain = || vec![StyledSpan::new(style::CODE_BLOCK, line)];
    let Some(lexer) = lexer else {
        return plain();
    };
    let tokens = lexer.tokenize(line);
    let rebuilt: String = tokens.iter().map(|(_, text)| text.as_str()).collect();
    if rebuilt != line {
        tracing::debug!("code tokenizer lost text, falling back to plain");
        return plain();
    }
    if line.is_empty() {
        return plain();
    }
    tokens
        .into_iter()
        .filter(|(_, text)| !text.is_empty())
        .map(|(class, text)| {
            if class.is_empty() {
                StyledSpan::new(style::CODE_BLOCK, text)
            } else {
                StyledSpan::new(format!("{} {class}", style::CODE_BLOCK), text)
            }
        })
        .collect()
}

struct Patterns {
    heading: Regex,
    task: Regex,
    inline: [(Regex, &'static str); 4],
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        heading: Regex::new(r"^#{1,6}\s").expect("valid regex"),
        task: Regex::new(r"^(\s*)((?:[-*+]|\d+[.)])\s+)(\[[ xX]\])(.*)$").expect("valid regex"),
        inline: [
            (Regex::new(r"`[^`]+`").expect("valid regex"), style::CODE_INLINE),
            (Regex::new(r"\$[^$\s](?:[^$]*[^$\s])?\$").expect("valid regex"), style::MATH_INLINE),
            (Regex::new(r"\*\*[^*]+\*\*|__[^_]+__").expect("valid regex"), style::STRONG),
            (Regex::new(r"\*[^*\s](?:[^*]*[^*\s])?\*|\b_[^_]+_\b").expect("valid regex"), style::EMPHASIS),
        ],
    })
}

fn lex_block_line(line: &str) -> Vec<StyledSpan> {
    let patterns = patterns();
    if patterns.heading.is_match(line) {
        return vec![StyledSpan::new(style::HEADING, line)];
    }
    if is_horizontal_rule(line) {
        return vec![StyledSpan::new(style::RULE, line)];
    }
    if line.trim_start().starts_with('>') {
        return vec![StyledSpan::new(style::QUOTE, line)];
    }
    if let Some(caps) = patterns.task.captures(line) {
        let mut spans = Vec::with_capacity(4);
        let indent = &caps[1];
        if !indent.is_empty() {
            spans.push(StyledSpan::new(style::LIST_INDENT, indent));
        }
        spans.push(StyledSpan::new(style::LIST_MARKER, &caps[2]));
        let checkbox = &caps[3];
        let checkbox_style = if checkbox == "[ ]" {
            style::TASK_UNCHECKED
        } else {
            style::TASK_CHECKED
        };
        spans.push(StyledSpan::new(checkbox_style, checkbox));
        let rest = &caps[4];
        if !rest.is_empty() {
            spans.extend(apply_inline(vec![StyledSpan::new(style::TEXT, rest)]));
        }
        return spans;
    }
    if line.contains('|') {
        return split_pipes(line);
    }
    apply_inline(vec![StyledSpan::new(style::TEXT, line)])
}

/// Three or more of the same rule character, optionally space separated.
fn is_horizontal_rule(line: &str) -> bool {
    let mut chars = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = chars.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for c in chars {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

/// Table rows are split into one span per character, so inline markup
/// never spans a cell boundary.
fn split_pipes(line: &str) -> Vec<StyledSpan> {
    line.char_indices()
        .map(|(idx, c)| {
            let tag = if c == '|' { style::TABLE_PIPE } else { style::TEXT };
            StyledSpan::new(tag, &line[idx..idx + c.len_utf8()])
        })
        .collect()
}

/// Run the inline passes in order; each pass only sees text the earlier
/// passes left as plain text.
fn apply_inline(mut spans: Vec<StyledSpan>) -> Vec<StyledSpan> {
    for (regex, tag) in &patterns().inline {
        let mut next = Vec::with_capacity(spans.len());
        for span in spans {
            if span.style != style::TEXT {
                next.push(span);
                continue;
            }
            let mut last = 0;
            for m in regex.find_iter(&span.text) {
                if m.start() > last {
                    next.push(StyledSpan::new(style::TEXT, &span.text[last..m.start()]));
                }
                next.push(StyledSpan::new(*tag, m.as_str()));
                last = m.end();
            }
            if last == 0 {
                next.push(span);
            } else if last < span.text.len() {
                next.push(StyledSpan::new(style::TEXT, &span.text[last..]));
            }
        }
        spans = next;
    }
    spans
}
