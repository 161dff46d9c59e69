use crate::CopyArgs;
use crate::commands::text_or_stdin;
use crate::output::print_json;
use anyhow::Result;
use promptline_core::EditorConfig;
use promptline_ui::ClipboardBridge;
use serde_json::json;
use std::io::Write;

pub(crate) fn run_copy(cfg: &EditorConfig, args: CopyArgs, json_mode: bool) -> Result<()> {
    let text = text_or_stdin(args.text)?;
    let bridge = if args.memory {
        ClipboardBridge::memory_only().with_config(&cfg.clipboard)
    } else {
        ClipboardBridge::system(&cfg.clipboard)
    };
    let stored = bridge.write(&text);
    if args.osc52 {
        // Keep stdout clean for JSON consumers; the terminal sees stderr too.
        if json_mode {
            bridge.broadcast(&mut std::io::stderr(), &text);
        } else {
            bridge.broadcast(&mut std::io::stdout(), &text);
        }
    }

    if json_mode {
        print_json(&json!({
            "stored": stored,
            "chars": text.chars().count(),
            "system_clipboard": bridge.has_system_clipboard(),
            "osc52": args.osc52,
        }))?;
    } else {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "copied {} chars", text.chars().count())?;
    }
    Ok(())
}

pub(crate) fn run_paste(cfg: &EditorConfig, json_mode: bool) -> Result<()> {
    let bridge = ClipboardBridge::system(&cfg.clipboard);
    let text = bridge.read();
    if json_mode {
        print_json(&json!({ "text": text }))?;
    } else if let Some(text) = text {
        println!("{text}");
    }
    Ok(())
}
