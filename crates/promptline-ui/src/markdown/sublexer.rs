//! Per-language tokenizers for fenced code blocks.
//!
//! A fence's language tag is resolved once when the fence opens; the returned
//! tokenizer then sees every line of that fence in order, so multi-line
//! constructs (block comments, strings) keep their state.

use std::sync::{Arc, OnceLock};
use syntect::easy::ScopeRangeIterator;
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};

/// Splits one line of code into `(class, text)` tokens. An empty class means
/// "no particular token class".
pub trait SubLexer {
    fn tokenize(&mut self, line: &str) -> Vec<(String, String)>;
}

/// Maps a fence language tag to a tokenizer. Unknown tags map to
/// [`PlainLexer`].
pub trait SubLexerRegistry: Send + Sync {
    fn resolve(&self, language: &str) -> Box<dyn SubLexer + '_>;
}

/// Identity tokenizer: the whole line as one classless token.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainLexer;

impl SubLexer for PlainLexer {
    fn tokenize(&mut self, line: &str) -> Vec<(String, String)> {
        vec![(String::new(), line.to_string())]
    }
}

/// Registry that never highlights.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainRegistry;

impl SubLexerRegistry for PlainRegistry {
    fn resolve(&self, _language: &str) -> Box<dyn SubLexer + '_> {
        Box::new(PlainLexer)
    }
}

/// Registry backed by syntect's bundled syntax definitions.
pub struct SyntectRegistry {
    syntax_set: SyntaxSet,
}

impl SyntectRegistry {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_nonewlines(),
        }
    }

    /// Process-wide instance; loading the syntax set is not cheap.
    pub fn shared() -> Arc<SyntectRegistry> {
        static REGISTRY: OnceLock<Arc<SyntectRegistry>> = OnceLock::new();
        REGISTRY.get_or_init(|| Arc::new(SyntectRegistry::new())).clone()
    }

    fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_token(language)
            .or_else(|| self.syntax_set.find_syntax_by_extension(language))
    }
}

impl Default for SyntectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubLexerRegistry for SyntectRegistry {
    fn resolve(&self, language: &str) -> Box<dyn SubLexer + '_> {
        let language = language.trim();
        if language.is_empty() {
            return Box::new(PlainLexer);
        }
        match self.find_syntax(language) {
            Some(syntax) => Box::new(SyntectLexer {
                syntax_set: &self.syntax_set,
                state: ParseState::new(syntax),
                stack: ScopeStack::new(),
                failed: false,
            }),
            None => {
                tracing::debug!(language, "no syntax for fence language");
                Box::new(PlainLexer)
            }
        }
    }
}

struct SyntectLexer<'a> {
    syntax_set: &'a SyntaxSet,
    state: ParseState,
    stack: ScopeStack,
    /// Set after a parse error; the rest of the fence stays plain.
    failed: bool,
}

impl SubLexer for SyntectLexer<'_> {
    fn tokenize(&mut self, line: &str) -> Vec<(String, String)> {
        if self.failed {
            return PlainLexer.tokenize(line);
        }
        let ops = match self.state.parse_line(line, self.syntax_set) {
            Ok(ops) => ops,
            Err(err) => {
                tracing::debug!(%err, "syntax parse failed");
                self.failed = true;
                return PlainLexer.tokenize(line);
            }
        };
        let mut tokens: Vec<(String, String)> = Vec::new();
        for (range, op) in ScopeRangeIterator::new(&ops, line) {
            if let Err(err) = self.stack.apply(op) {
                tracing::debug!(?err, "scope stack rejected op");
                self.failed = true;
                return PlainLexer.tokenize(line);
            }
            if range.is_empty() {
                continue;
            }
            let class = self
                .stack
                .as_slice()
                .last()
                .map(token_class)
                .unwrap_or_default();
            let text = &line[range];
            match tokens.last_mut() {
                Some((last_class, last_text)) if *last_class == class => last_text.push_str(text),
                _ => tokens.push((class, text.to_string())),
            }
        }
        tokens
    }
}

/// `keyword.control.rust` → `syntax.keyword`; top-level `source.*` and
/// `text.*` scopes carry no class.
fn token_class(scope: &Scope) -> String {
    let name = scope.build_string();
    let head = name.split('.').next().unwrap_or_default();
    match head {
        "" | "source" | "text" => String::new(),
        other => format!("syntax.{other}"),
    }
}
