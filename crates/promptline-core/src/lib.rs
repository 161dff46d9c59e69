use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

mod document;

pub use document::{Document, RenderProjection};

pub type Result<T> = anyhow::Result<T>;

/// Completion lists never grow beyond this many entries unless configured.
pub const DEFAULT_MAX_COMPLETIONS: usize = 30;
/// Marker that opens a template token in the prompt (e.g. `{{prompt:review`).
pub const DEFAULT_TEMPLATE_SENTINEL: &str = "{{";

pub fn runtime_dir(workspace: &Path) -> PathBuf {
    workspace.join(".promptline")
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub completion: CompletionConfig,
    pub clipboard: ClipboardConfig,
    pub markdown: MarkdownConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    pub max_completions: usize,
    pub template_sentinel: String,
    /// File extensions (without the dot) that `/edit` path completion offers.
    pub editable_extensions: Vec<String>,
    /// Commands registered on top of the built-in set.
    pub extra_commands: Vec<CommandConfig>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_completions: DEFAULT_MAX_COMPLETIONS,
            template_sentinel: DEFAULT_TEMPLATE_SENTINEL.to_string(),
            editable_extensions: default_editable_extensions(),
            extra_commands: Vec::new(),
        }
    }
}

pub fn default_editable_extensions() -> Vec<String> {
    [
        "md", "markdown", "txt", "rst", "org", "adoc", "json", "yaml", "yml", "toml",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

/// A user-defined slash command. `options` and `path` are mutually exclusive;
/// when both are set the option list wins.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CommandConfig {
    pub name: String,
    pub description: String,
    pub options: Vec<String>,
    pub path: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Upper bound for each clipboard utility invocation.
    pub timeout_ms: u64,
    /// Allow the OSC 52 escape-sequence broadcast.
    pub osc52: bool,
    /// Wrap OSC 52 in a tmux passthrough envelope when running under tmux.
    pub tmux_passthrough: bool,
    /// Largest base64 payload the broadcast will emit.
    pub osc52_max_bytes: usize,
    /// Try the native clipboard library after the subprocess utilities.
    pub native: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            osc52: true,
            tmux_passthrough: true,
            osc52_max_bytes: 100_000,
            native: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Highlight fenced code with a language sub-lexer.
    pub syntax_highlighting: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            syntax_highlighting: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub primary: String,
    pub secondary: String,
    pub error: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary: "Cyan".to_string(),
            secondary: "Yellow".to_string(),
            error: "Red".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn user_settings_path() -> Option<PathBuf> {
        let home = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())?;
        Some(Path::new(&home).join(".promptline/settings.json"))
    }

    pub fn project_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    pub fn project_local_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.local.json")
    }

    pub fn legacy_toml_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("config.toml")
    }

    /// Load settings for `workspace`: defaults, then the legacy TOML file, then
    /// user, project and project-local JSON files, later layers winning key by
    /// key. `extra_commands` collects the commands of every layer.
    pub fn load(workspace: &Path) -> Result<Self> {
        Self::load_layered(workspace, Self::user_settings_path().as_deref())
    }

    pub fn load_layered(workspace: &Path, user_settings: Option<&Path>) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        let legacy = Self::legacy_toml_path(workspace);
        if legacy.exists() {
            let raw = fs::read_to_string(legacy)?;
            let legacy_value: toml::Value = toml::from_str(&raw)?;
            merge_layer(&mut merged, &serde_json::to_value(legacy_value)?);
        }

        let mut paths = Vec::new();
        if let Some(user) = user_settings {
            paths.push(user.to_path_buf());
        }
        paths.push(Self::project_settings_path(workspace));
        paths.push(Self::project_local_settings_path(workspace));

        for path in paths {
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(path)?;
            let value: Value = serde_json::from_str(&raw)?;
            merge_layer(&mut merged, &value);
        }

        Ok(serde_json::from_value(merged)?)
    }

    pub fn save(&self, workspace: &Path) -> Result<()> {
        let path = Self::project_settings_path(workspace);
        fs::create_dir_all(
            path.parent()
                .ok_or_else(|| anyhow::anyhow!("invalid config path"))?,
        )?;
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

/// Lists that accumulate across settings layers instead of being replaced.
const ACCUMULATED_LISTS: &[&str] = &["extra_commands"];

/// Overlay one settings layer. Objects merge key by key and `null` keeps the
/// lower layer's value. Entries of accumulated lists are appended, replacing an
/// earlier entry with the same `name`.
fn merge_layer(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base_obj), Value::Object(overlay_obj)) => {
            for (key, overlay_value) in overlay_obj {
                match (base_obj.get_mut(key), overlay_value) {
                    (Some(Value::Array(existing)), Value::Array(entries))
                        if ACCUMULATED_LISTS.contains(&key.as_str()) =>
                    {
                        append_named(existing, entries);
                    }
                    (Some(base_value), _) => merge_layer(base_value, overlay_value),
                    (None, Value::Null) => {}
                    (None, _) => {
                        base_obj.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

fn append_named(existing: &mut Vec<Value>, entries: &[Value]) {
    for entry in entries {
        let name = entry.get("name");
        let prior = existing
            .iter_mut()
            .find(|prior| name.is_some() && prior.get("name") == name);
        match prior {
            Some(prior) => *prior = entry.clone(),
            None => existing.push(entry.clone()),
        }
    }
}
