use crate::CompleteArgs;
use crate::output::print_json;
use anyhow::Result;
use promptline_core::EditorConfig;
use promptline_ui::{Completion, CompletionEngine};
use serde_json::json;
use std::path::Path;

pub(crate) fn run_complete(
    workspace: &Path,
    cfg: &EditorConfig,
    args: CompleteArgs,
    json_mode: bool,
) -> Result<()> {
    let mut engine = CompletionEngine::from_config(workspace, &cfg.completion);
    if !args.templates.is_empty() {
        engine = engine.with_templates(args.templates);
    }
    let candidates = if args.editable_path {
        engine.complete_editable_path(&args.text)
    } else {
        engine.complete(&args.text)
    };

    if json_mode {
        let rows: Vec<serde_json::Value> = candidates.iter().map(candidate_json).collect();
        print_json(&rows)?;
    } else if candidates.is_empty() {
        println!("no completions");
    } else {
        for candidate in &candidates {
            match &candidate.display_meta {
                Some(meta) => println!("{}\t{}", candidate.display, meta),
                None => println!("{}", candidate.display),
            }
        }
    }
    Ok(())
}

fn candidate_json(candidate: &Completion) -> serde_json::Value {
    json!({
        "text": candidate.text,
        "start_position": candidate.start_position,
        "display": candidate.display,
        "display_meta": candidate.display_meta,
    })
}
