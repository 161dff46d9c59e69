pub mod clipboard;
pub mod completion;
pub mod markdown;
pub mod navigation;
pub mod theme;
pub mod width;

pub use clipboard::{ClipboardBackend, ClipboardBridge, CommandBackend, MemoryClipboard};
pub use completion::{
    ArgumentSpec, CommandRegistry, CommandSpec, Completion, CompletionEngine, TemplateSource,
};
pub use markdown::{LexState, LexedDocument, MarkdownLexer, StyledSpan};
pub use navigation::{Direction, alt_backspace_clear_count, target_index};
pub use theme::Theme;
pub use width::char_width;
