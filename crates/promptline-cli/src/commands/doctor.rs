use crate::output::print_json;
use anyhow::Result;
use promptline_core::{EditorConfig, runtime_dir};
use promptline_ui::ClipboardBridge;
use serde_json::json;
use std::path::Path;

pub(crate) fn run_doctor(workspace: &Path, cfg: &EditorConfig, json_mode: bool) -> Result<()> {
    let payload = doctor_payload(workspace, cfg);
    if json_mode {
        print_json(&payload)?;
        return Ok(());
    }

    println!("workspace: {}", workspace.display());
    let backends = payload["clipboard"]["backends"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    format!(
                        "{}={}",
                        row["name"].as_str().unwrap_or_default(),
                        if row["available"].as_bool().unwrap_or(false) {
                            "yes"
                        } else {
                            "no"
                        }
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    println!(
        "clipboard: {} | system_clipboard={} osc52={} tmux={}",
        if backends.is_empty() { "none".to_string() } else { backends },
        payload["clipboard"]["system_clipboard"].as_bool().unwrap_or(false),
        payload["clipboard"]["osc52"].as_bool().unwrap_or(false),
        payload["clipboard"]["tmux"].as_bool().unwrap_or(false),
    );
    println!(
        "markdown: syntax_highlighting={}",
        payload["markdown"]["syntax_highlighting"]
            .as_bool()
            .unwrap_or(false)
    );
    if let Some(layers) = payload["settings"].as_array() {
        for layer in layers {
            println!(
                "settings: {} ({})",
                layer["path"].as_str().unwrap_or_default(),
                if layer["exists"].as_bool().unwrap_or(false) {
                    "present"
                } else {
                    "absent"
                }
            );
        }
    }
    Ok(())
}

fn doctor_payload(workspace: &Path, cfg: &EditorConfig) -> serde_json::Value {
    let bridge = ClipboardBridge::system(&cfg.clipboard);
    let backends: Vec<serde_json::Value> = bridge
        .backend_status()
        .into_iter()
        .map(|(name, available)| json!({"name": name, "available": available}))
        .collect();

    let mut layers = vec![EditorConfig::legacy_toml_path(workspace)];
    if let Some(user) = EditorConfig::user_settings_path() {
        layers.push(user);
    }
    layers.push(EditorConfig::project_settings_path(workspace));
    layers.push(EditorConfig::project_local_settings_path(workspace));
    let settings: Vec<serde_json::Value> = layers
        .iter()
        .map(|path| json!({"path": path.display().to_string(), "exists": path.exists()}))
        .collect();

    json!({
        "workspace": workspace.display().to_string(),
        "runtime_dir": runtime_dir(workspace).display().to_string(),
        "os": std::env::consts::OS,
        "clipboard": {
            "backends": backends,
            "system_clipboard": bridge.has_system_clipboard(),
            "osc52": cfg.clipboard.osc52,
            "tmux": std::env::var_os("TMUX").is_some(),
            "timeout_ms": cfg.clipboard.timeout_ms,
        },
        "markdown": {
            "syntax_highlighting": cfg.markdown.syntax_highlighting,
        },
        "completion": {
            "max_completions": cfg.completion.max_completions,
            "template_sentinel": cfg.completion.template_sentinel,
        },
        "settings": settings,
    })
}
