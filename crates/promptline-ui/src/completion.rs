//! Prompt completion: slash commands, their arguments, `{{template` tokens
//! and `@path` file references.
//!
//! Exactly one trigger grammar answers each request, checked in that order
//! against the text before the cursor. Every candidate replaces a suffix of
//! the token the user is typing, never text outside it.

use promptline_core::{CommandConfig, CompletionConfig, DEFAULT_MAX_COMPLETIONS, Document};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single completion candidate.
///
/// Hosts apply it by deleting `-start_position` characters before the cursor
/// and inserting `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub start_position: isize,
    pub display: String,
    pub display_meta: Option<String>,
}

impl Completion {
    pub fn new(text: impl Into<String>, start_position: isize) -> Self {
        let text = text.into();
        Self {
            display: text.clone(),
            text,
            start_position,
            display_meta: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        let meta = meta.into();
        self.display_meta = (!meta.is_empty()).then_some(meta);
        self
    }

    /// Splice this candidate into `doc` at its cursor.
    pub fn apply(&self, doc: &Document) -> Document {
        let chars: Vec<char> = doc.text().chars().collect();
        let cursor = doc.cursor();
        let start = cursor - self.start_position.unsigned_abs().min(cursor);
        let mut text: String = chars[..start].iter().collect();
        text.push_str(&self.text);
        let new_cursor = start + self.text.chars().count();
        text.extend(chars[cursor..].iter());
        Document::new(text, new_cursor)
    }
}

/// What a command accepts as its first argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentSpec {
    None,
    /// Fixed vocabulary offered in declaration order.
    Options(Vec<String>),
    /// Workspace-relative path to an editable document.
    EditablePath,
}

impl ArgumentSpec {
    pub fn options(values: &[&str]) -> Self {
        Self::Options(values.iter().map(|v| v.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub args: ArgumentSpec,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, args: ArgumentSpec) -> Self {
        let mut name = name.into();
        if !name.starts_with('/') {
            name.insert(0, '/');
        }
        Self {
            name,
            description: description.into(),
            args,
        }
    }
}

impl From<&CommandConfig> for CommandSpec {
    fn from(cfg: &CommandConfig) -> Self {
        let args = if !cfg.options.is_empty() {
            ArgumentSpec::Options(cfg.options.clone())
        } else if cfg.path {
            ArgumentSpec::EditablePath
        } else {
            ArgumentSpec::None
        };
        Self::new(cfg.name.clone(), cfg.description.clone(), args)
    }
}

/// Slash commands known to the prompt, in the order they are suggested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
}

const TOGGLE: &[&str] = &["on", "off"];
const CLEAR_TARGETS: &[&str] = &["history", "todos", "screen", "all"];

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_commands() -> Self {
        let builtin = [
            ("/help", "Show available commands", ArgumentSpec::None),
            ("/config", "Show current configuration", ArgumentSpec::None),
            ("/learn", "Toggle learning mode", ArgumentSpec::options(TOGGLE)),
            ("/verbose", "Toggle verbose output", ArgumentSpec::options(TOGGLE)),
            ("/clear", "Clear session state", ArgumentSpec::options(CLEAR_TARGETS)),
            ("/todo", "Show the todo list", ArgumentSpec::None),
            ("/edit", "Open a document in the editor", ArgumentSpec::EditablePath),
            ("/exit", "Exit the session", ArgumentSpec::None),
        ];
        let mut registry = Self::new();
        for (name, description, args) in builtin {
            registry.register(CommandSpec::new(name, description, args));
        }
        registry
    }

    /// Commands with no arguments, one per name.
    pub fn from_names(names: &[&str]) -> Self {
        let mut registry = Self::new();
        for name in names {
            registry.register(CommandSpec::new(*name, "", ArgumentSpec::None));
        }
        registry
    }

    /// Add `spec`, replacing any command of the same name in place.
    pub fn register(&mut self, spec: CommandSpec) {
        if let Some(existing) = self.commands.iter_mut().find(|c| c.name == spec.name) {
            *existing = spec;
        } else {
            self.commands.push(spec);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("absolute paths are not completed")]
    Absolute,
    #[error("path traversal denied")]
    Traversal,
}

/// Supplies the template identifiers offered after the sentinel.
pub type TemplateSource = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathFilter {
    Any,
    Editable,
}

pub struct CompletionEngine {
    registry: CommandRegistry,
    workspace: PathBuf,
    sentinel: String,
    editable_extensions: Vec<String>,
    max_completions: usize,
    templates: Option<TemplateSource>,
}

impl CompletionEngine {
    pub fn new(workspace: impl Into<PathBuf>, registry: CommandRegistry) -> Self {
        let defaults = CompletionConfig::default();
        Self {
            registry,
            workspace: workspace.into(),
            sentinel: defaults.template_sentinel,
            editable_extensions: defaults.editable_extensions,
            max_completions: DEFAULT_MAX_COMPLETIONS,
            templates: None,
        }
    }

    /// Built-in commands plus the configured extras, with configured limits.
    pub fn from_config(workspace: impl Into<PathBuf>, cfg: &CompletionConfig) -> Self {
        let mut registry = CommandRegistry::default_commands();
        for extra in &cfg.extra_commands {
            registry.register(CommandSpec::from(extra));
        }
        Self::new(workspace, registry)
            .with_sentinel(cfg.template_sentinel.clone())
            .with_editable_extensions(cfg.editable_extensions.clone())
            .with_max_completions(cfg.max_completions)
    }

    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    pub fn with_editable_extensions(mut self, extensions: Vec<String>) -> Self {
        self.editable_extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_max_completions(mut self, max: usize) -> Self {
        self.max_completions = max;
        self
    }

    pub fn with_template_source(mut self, source: TemplateSource) -> Self {
        self.templates = Some(source);
        self
    }

    /// Offer a fixed template list.
    pub fn with_templates(self, templates: Vec<String>) -> Self {
        self.with_template_source(Arc::new(move || templates.clone()))
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn complete_document(&self, doc: &Document) -> Vec<Completion> {
        self.complete(doc.text_before_cursor())
    }

    /// Candidates for the text immediately before the cursor.
    pub fn complete(&self, text_before_cursor: &str) -> Vec<Completion> {
        let mut out = if text_before_cursor.starts_with('/') {
            self.complete_command(text_before_cursor)
        } else if let Some(fragment) = self.template_fragment(text_before_cursor) {
            self.complete_template(fragment)
        } else if let Some(at) = text_before_cursor.rfind('@') {
            self.complete_path(&text_before_cursor[at + 1..], PathFilter::Any)
        } else {
            Vec::new()
        };
        out.truncate(self.max_completions);
        out
    }

    /// Path candidates for a single command argument, limited to editable
    /// documents and directories.
    pub fn complete_editable_path(&self, arg: &str) -> Vec<Completion> {
        let mut out = self.complete_path(arg, PathFilter::Editable);
        out.truncate(self.max_completions);
        out
    }

    fn complete_command(&self, text: &str) -> Vec<Completion> {
        let Some(split) = text.find(char::is_whitespace) else {
            let replace = -(text.chars().count() as isize);
            return self
                .registry
                .iter()
                .filter(|cmd| cmd.name.starts_with(text))
                .map(|cmd| Completion::new(cmd.name.clone(), replace).with_meta(cmd.description.clone()))
                .collect();
        };
        let Some(spec) = self.registry.get(&text[..split]) else {
            return Vec::new();
        };
        let args = &text[split..];
        let tokens: Vec<&str> = args.split_whitespace().collect();
        let partial = match (tokens.as_slice(), args.ends_with(char::is_whitespace)) {
            ([], _) => "",
            ([token], false) => token,
            _ => return Vec::new(),
        };
        let replace = -(partial.chars().count() as isize);
        match &spec.args {
            ArgumentSpec::None => Vec::new(),
            ArgumentSpec::Options(options) => options
                .iter()
                .filter(|option| option.starts_with(partial))
                .map(|option| Completion::new(option.clone(), replace))
                .collect(),
            ArgumentSpec::EditablePath => self.complete_path(partial, PathFilter::Editable),
        }
    }

    /// The fragment typed after the last sentinel, if the cursor is still
    /// inside that token.
    fn template_fragment<'a>(&self, text: &'a str) -> Option<&'a str> {
        if self.sentinel.is_empty() {
            return None;
        }
        let pos = text.rfind(&self.sentinel)?;
        let fragment = &text[pos + self.sentinel.len()..];
        if fragment.chars().any(char::is_whitespace) {
            return None;
        }
        Some(fragment)
    }

    fn complete_template(&self, fragment: &str) -> Vec<Completion> {
        let Some(source) = &self.templates else {
            return Vec::new();
        };
        let replace = -(fragment.chars().count() as isize);
        source()
            .into_iter()
            .filter_map(|id| {
                let kind = match id.split_once(':') {
                    Some((kind, name)) if id.starts_with(fragment) || name.starts_with(fragment) => {
                        kind.to_string()
                    }
                    None if id.starts_with(fragment) => String::new(),
                    _ => return None,
                };
                Some(Completion::new(id, replace).with_meta(kind))
            })
            .collect()
    }

    fn complete_path(&self, prefix: &str, filter: PathFilter) -> Vec<Completion> {
        if let Err(err) = check_relative(prefix) {
            tracing::debug!(prefix, %err, "path completion skipped");
            return Vec::new();
        }
        let (dir, name_prefix) = match prefix.rfind('/') {
            Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
            None => ("", prefix),
        };
        let dir_path = self.workspace.join(dir);
        let entries = match fs::read_dir(&dir_path) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::trace!(dir = %dir_path.display(), %err, "cannot list directory");
                return Vec::new();
            }
        };
        let mut names: Vec<(String, bool)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    return None;
                }
                Some((name, entry.path().is_dir()))
            })
            .collect();
        names.sort();

        let replace = -(name_prefix.chars().count() as isize);
        names
            .into_iter()
            .filter(|(name, is_dir)| {
                *is_dir || filter == PathFilter::Any || self.is_editable(name)
            })
            .map(|(name, is_dir)| if is_dir { format!("{name}/") } else { name })
            .filter(|candidate| candidate.starts_with(name_prefix))
            .map(|candidate| Completion::new(candidate, replace))
            .collect()
    }

    fn is_editable(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.editable_extensions.iter().any(|allowed| *allowed == ext)
            })
    }
}

/// Reject prefixes that would list anything outside the workspace.
fn check_relative(prefix: &str) -> Result<(), PathError> {
    if prefix.starts_with('/') || prefix.starts_with('\\') || Path::new(prefix).is_absolute() {
        return Err(PathError::Absolute);
    }
    if prefix.split(['/', '\\']).any(|part| part == "..") {
        return Err(PathError::Traversal);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn texts(items: &[Completion]) -> Vec<&str> {
        items.iter().map(|c| c.text.as_str()).collect()
    }

    fn engine() -> CompletionEngine {
        CompletionEngine::new(".", CommandRegistry::default_commands())
    }

    #[test]
    fn completes_command_names_by_prefix() {
        let engine = CompletionEngine::new(".", CommandRegistry::from_names(&["/learn", "/config"]));
        let out = engine.complete("/lea");
        assert_eq!(texts(&out), vec!["/learn"]);
        assert_eq!(out[0].start_position, -4);
    }

    #[test]
    fn bare_slash_lists_every_command_in_order() {
        let out = engine().complete("/");
        assert_eq!(out.len(), CommandRegistry::default_commands().len());
        assert_eq!(out[0].text, "/help");
        assert_eq!(out[0].display_meta.as_deref(), Some("Show available commands"));
    }

    #[test]
    fn command_matching_is_case_sensitive() {
        assert!(engine().complete("/LEA").is_empty());
    }

    #[test]
    fn toggle_arguments_filter_by_prefix() {
        let out = engine().complete("/learn o");
        assert_eq!(texts(&out), vec!["on", "off"]);
        assert!(out.iter().all(|c| c.start_position == -1));
        assert_eq!(texts(&engine().complete("/learn of")), vec!["off"]);
    }

    #[test]
    fn first_space_after_command_offers_all_options() {
        let out = engine().complete("/clear ");
        assert_eq!(texts(&out), vec!["history", "todos", "screen", "all"]);
        assert!(out.iter().all(|c| c.start_position == 0));
    }

    #[test]
    fn later_argument_positions_stay_quiet() {
        assert!(engine().complete("/learn on ").is_empty());
        assert!(engine().complete("/learn on o").is_empty());
    }

    #[test]
    fn unknown_command_or_plain_command_has_no_arguments() {
        assert!(engine().complete("/nope ").is_empty());
        assert!(engine().complete("/help ").is_empty());
    }

    #[test]
    fn template_tokens_match_full_id_or_name_part() {
        let engine = engine().with_templates(vec![
            "prompt:review".to_string(),
            "prompt:refactor".to_string(),
            "summary".to_string(),
        ]);
        let out = engine.complete("please {{re");
        assert_eq!(texts(&out), vec!["prompt:review", "prompt:refactor"]);
        assert_eq!(out[0].start_position, -2);
        assert_eq!(out[0].display_meta.as_deref(), Some("prompt"));

        let out = engine.complete("{{prompt:rev");
        assert_eq!(texts(&out), vec!["prompt:review"]);
        assert_eq!(out[0].start_position, -10);

        assert_eq!(texts(&engine.complete("{{su")), vec!["summary"]);
    }

    #[test]
    fn whitespace_after_sentinel_ends_template_context() {
        let engine = engine().with_templates(vec!["summary".to_string()]);
        assert!(engine.complete("{{summary and more").is_empty());
    }

    #[test]
    fn templates_take_precedence_over_file_references() {
        let engine = engine().with_templates(vec!["summary".to_string()]);
        let out = engine.complete("@notes {{s");
        assert_eq!(texts(&out), vec!["summary"]);
    }

    #[test]
    fn file_references_list_workspace_entries() {
        let workspace = TempDir::new().expect("workspace");
        fs::create_dir_all(workspace.path().join("src")).expect("src");
        fs::write(workspace.path().join("Cargo.toml"), "").expect("file");
        fs::write(workspace.path().join(".env"), "").expect("hidden");
        let engine = CompletionEngine::new(workspace.path(), CommandRegistry::new());

        let out = engine.complete("look at @");
        assert_eq!(texts(&out), vec!["Cargo.toml", "src/"]);
        assert!(out.iter().all(|c| c.start_position == 0));

        let out = engine.complete("@sr");
        assert_eq!(texts(&out), vec!["src/"]);
        assert_eq!(out[0].start_position, -2);
    }

    #[test]
    fn file_references_reject_escapes() {
        let engine = engine();
        assert!(engine.complete("@/etc/").is_empty());
        assert!(engine.complete("@../").is_empty());
        assert_eq!(check_relative("../x"), Err(PathError::Traversal));
        assert_eq!(check_relative("/x"), Err(PathError::Absolute));
        assert_eq!(check_relative("docs/x"), Ok(()));
    }

    #[test]
    fn edit_completion_filters_by_extension() {
        let workspace = TempDir::new().expect("workspace");
        fs::create_dir_all(workspace.path().join("notes")).expect("notes");
        fs::write(workspace.path().join("README.md"), "").expect("md");
        fs::write(workspace.path().join("main.rs"), "").expect("rs");
        fs::write(workspace.path().join("todo.TXT"), "").expect("txt");
        let engine = CompletionEngine::new(workspace.path(), CommandRegistry::default_commands());

        let out = engine.complete("/edit ");
        assert_eq!(texts(&out), vec!["README.md", "notes/", "todo.TXT"]);
        let out = engine.complete("/edit R");
        assert_eq!(texts(&out), vec!["README.md"]);
        assert!(engine.complete("/edit /etc/").is_empty());
        assert!(engine.complete_editable_path("../").is_empty());
    }

    #[test]
    fn results_are_capped() {
        let names: Vec<String> = (0..40).map(|i| format!("/cmd{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        let engine = CompletionEngine::new(".", CommandRegistry::from_names(&refs));
        assert_eq!(engine.complete("/cmd").len(), 30);
        let engine = engine.with_max_completions(5);
        assert_eq!(engine.complete("/cmd").len(), 5);
    }

    #[test]
    fn extra_commands_come_from_config() {
        let mut cfg = CompletionConfig::default();
        cfg.extra_commands.push(CommandConfig {
            name: "deploy".to_string(),
            description: "Ship it".to_string(),
            options: vec!["staging".to_string(), "prod".to_string()],
            path: false,
        });
        let engine = CompletionEngine::from_config(".", &cfg);
        assert_eq!(texts(&engine.complete("/dep")), vec!["/deploy"]);
        assert_eq!(texts(&engine.complete("/deploy p")), vec!["prod"]);
    }

    #[test]
    fn apply_splices_candidate_at_cursor() {
        let doc = Document::new("run /lea now", 8);
        let applied = Completion::new("/learn", -4).apply(&doc);
        assert_eq!(applied.text(), "run /learn now");
        assert_eq!(applied.cursor(), 10);
    }

    #[test]
    fn plain_text_yields_nothing() {
        assert!(engine().complete("hello world").is_empty());
        assert!(engine().complete("").is_empty());
    }
}
