use promptline_core::{Document, EditorConfig, RenderProjection};
use promptline_ui::markdown::style;
use promptline_ui::{
    ClipboardBridge, CommandRegistry, CompletionEngine, Direction, MarkdownLexer,
    alt_backspace_clear_count, target_index,
};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn texts(items: &[promptline_ui::Completion]) -> Vec<String> {
    items.iter().map(|c| c.text.clone()).collect()
}

#[test]
fn file_reference_completion_over_a_workspace() {
    let workspace = TempDir::new().expect("workspace");
    fs::create_dir_all(workspace.path().join("draft")).expect("draft dir");
    fs::write(workspace.path().join("draft/a.md"), "# a").expect("a.md");
    fs::write(workspace.path().join("draft/b.txt"), "b").expect("b.txt");
    fs::write(workspace.path().join("draft/.hidden"), "").expect("hidden");

    let engine = CompletionEngine::new(workspace.path(), CommandRegistry::default_commands());
    assert_eq!(texts(&engine.complete("@draft/")), vec!["a.md", "b.txt"]);

    let narrowed = engine.complete("@draft/a");
    assert_eq!(texts(&narrowed), vec!["a.md"]);
    assert_eq!(narrowed[0].start_position, -1);

    let doc = Document::at_end("read @draft/a please");
    let doc = doc.with_cursor("read @draft/a".chars().count());
    let applied = narrowed[0].apply(&doc);
    assert_eq!(applied.text(), "read @draft/a.md please");
    assert_eq!(applied.text_before_cursor(), "read @draft/a.md");
}

#[test]
fn edit_command_only_surfaces_documents_and_directories() {
    let workspace = TempDir::new().expect("workspace");
    fs::create_dir_all(workspace.path().join("docs")).expect("docs");
    fs::write(workspace.path().join("notes.md"), "").expect("notes");
    fs::write(workspace.path().join("main.rs"), "").expect("main");

    let engine = CompletionEngine::new(workspace.path(), CommandRegistry::default_commands());
    assert_eq!(texts(&engine.complete("/edit ")), vec!["docs/", "notes.md"]);
    assert!(engine.complete("/edit /etc/").is_empty());
    assert!(engine.complete("/edit ../").is_empty());
}

#[test]
fn configured_engine_uses_workspace_settings() {
    let workspace = TempDir::new().expect("workspace");
    let runtime = promptline_core::runtime_dir(workspace.path());
    fs::create_dir_all(&runtime).expect("runtime");
    fs::write(
        runtime.join("settings.json"),
        r#"{"completion":{"template_sentinel":"<<","extra_commands":[{"name":"deploy","description":"Ship it","options":["staging","prod"]}]}}"#,
    )
    .expect("settings");
    let cfg = EditorConfig::load_layered(workspace.path(), None).expect("config");
    let engine = CompletionEngine::from_config(workspace.path(), &cfg.completion)
        .with_templates(vec!["prompt:summary".to_string()]);

    assert_eq!(texts(&engine.complete("/deploy p")), vec!["prod"]);
    assert_eq!(texts(&engine.complete("x <<sum")), vec!["prompt:summary"]);
    assert!(engine.complete("x {{sum").is_empty());
}

#[test]
fn lexing_a_mixed_document() {
    let text = "# Plan\n- [ ] write `code`\n```rust\nfn main() {}\n```\n$$\nE = mc^2\n$$\n| a | b |";
    let lexed = MarkdownLexer::highlighted().lex_text(text);
    assert_eq!(lexed.line_count(), 9);
    assert_eq!(lexed.line(0)[0].style, style::HEADING);
    assert_eq!(lexed.line(1)[1].style, style::TASK_UNCHECKED);
    assert!(lexed.line(3).iter().all(|s| s.style.starts_with(style::CODE_BLOCK)));
    assert_eq!(lexed.line(6)[0].style, style::MATH_BLOCK);
    assert_eq!(lexed.line(8)[0].style, style::TABLE_PIPE);
    assert!(!lexed.final_state().in_fence);
    assert!(!lexed.final_state().in_math_block);
    assert_eq!(lexed.line(42), vec![promptline_ui::StyledSpan::new(style::TEXT, "")]);
}

#[test]
fn clipboard_without_system_backends_round_trips() {
    let bridge = ClipboardBridge::memory_only();
    assert!(bridge.write("hello"));
    assert_eq!(bridge.read().as_deref(), Some("hello"));
}

#[test]
fn navigation_across_an_unwrapped_document() {
    let doc = Document::new("hello\nhi", 3);
    let projection = RenderProjection::new((3, 0), 0)
        .with_row(0, 0, 0, 0)
        .with_row(1, 1, 0, 0);
    assert_eq!(target_index(&doc, &projection, Direction::Down), Some(8));
    assert_eq!(target_index(&doc, &projection, Direction::Up), None);
    assert_eq!(alt_backspace_clear_count(&doc), 3);
}

fn markdown_line() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("```".to_string()),
            Just("$$".to_string()),
            Just("# ".to_string()),
            Just("> ".to_string()),
            Just("- [x] ".to_string()),
            Just("|".to_string()),
            Just("`".to_string()),
            Just("*".to_string()),
            Just("_".to_string()),
            Just("$".to_string()),
            Just("日本".to_string()),
            "[a-z ]{0,6}",
        ],
        0..8,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn spans_concatenate_to_the_source_line(lines in prop::collection::vec(markdown_line(), 0..12)) {
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let lexed = MarkdownLexer::plain().lex(&refs);
        prop_assert_eq!(lexed.line_count(), lines.len());
        for (idx, line) in lines.iter().enumerate() {
            let joined: String = lexed.line(idx).iter().map(|s| s.text.as_str()).collect();
            prop_assert_eq!(&joined, line);
        }
    }

    #[test]
    fn fence_state_follows_delimiter_parity(body in prop::collection::vec("[a-z ]{0,8}", 0..6), fences in 0usize..5) {
        let mut lines: Vec<String> = Vec::new();
        for _ in 0..fences {
            lines.push("```".to_string());
            lines.extend(body.iter().cloned());
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let lexed = MarkdownLexer::plain().lex(&refs);
        prop_assert_eq!(lexed.final_state().in_fence, fences % 2 == 1);
    }

    #[test]
    fn math_state_follows_delimiter_parity(body in prop::collection::vec("[a-z =^]{0,8}", 0..6), delimiters in 0usize..5) {
        let mut lines: Vec<String> = Vec::new();
        for _ in 0..delimiters {
            lines.push("$$".to_string());
            lines.extend(body.iter().cloned());
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let lexed = MarkdownLexer::plain().lex(&refs);
        prop_assert_eq!(lexed.final_state().in_math_block, delimiters % 2 == 1);
        prop_assert!(!lexed.final_state().in_fence);
        for (idx, line) in lines.iter().enumerate() {
            if line == "$$" {
                let spans = lexed.line(idx);
                prop_assert_eq!(spans[0].style.as_str(), style::MATH_DELIM);
            }
        }
    }

    #[test]
    fn completions_never_reach_past_the_typed_token(input in "[/@a-z {}:.]{0,12}") {
        let engine = CompletionEngine::new(".", CommandRegistry::default_commands())
            .with_templates(vec!["skill:review".to_string(), "plain".to_string()]);
        let typed = input.chars().count() as isize;
        for candidate in engine.complete(&input) {
            prop_assert!(candidate.start_position <= 0);
            prop_assert!(-candidate.start_position <= typed);
        }
    }
}
