use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use promptline_core::EditorConfig;
use std::path::PathBuf;

mod commands;
mod output;

use commands::clipboard::{run_copy, run_paste};
use commands::complete::run_complete;
use commands::doctor::run_doctor;
use commands::highlight::run_highlight;
use commands::navigate::run_navigate;

#[derive(Parser)]
#[command(name = "promptline")]
#[command(about = "Editing primitives for multi-line terminal prompts", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    /// Log degradations (missing clipboard tools, unknown fence languages) to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace root used for `@` completion and settings; defaults to the current directory.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List completion candidates for the text before the cursor.
    Complete(CompleteArgs),
    /// Print styled markdown spans for a file or stdin.
    Highlight(HighlightArgs),
    /// Copy text (argument or stdin) to the clipboard.
    Copy(CopyArgs),
    /// Print the clipboard contents.
    Paste,
    /// Compute the cursor index after an up/down move in soft-wrapped text.
    Navigate(NavigateArgs),
    /// Report clipboard backends and settings locations.
    Doctor,
}

#[derive(Args)]
struct CompleteArgs {
    text: String,
    /// Template identifier offered after the template sentinel; repeatable.
    #[arg(long = "template")]
    templates: Vec<String>,
    /// Treat TEXT as a single `/edit` argument.
    #[arg(long)]
    editable_path: bool,
}

#[derive(Args)]
struct HighlightArgs {
    file: Option<PathBuf>,
    /// Style fenced code as one block, without language tokens.
    #[arg(long)]
    plain: bool,
}

#[derive(Args)]
struct CopyArgs {
    text: Option<String>,
    /// Also emit an OSC 52 sequence so the terminal sets its clipboard.
    #[arg(long)]
    osc52: bool,
    /// Skip system clipboards and use only the in-process store.
    #[arg(long)]
    memory: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Up,
    Down,
}

#[derive(Args)]
struct NavigateArgs {
    text: String,
    /// Cursor position as a character index.
    #[arg(long)]
    cursor: usize,
    #[arg(long, value_enum)]
    direction: DirectionArg,
    /// Wrap width in terminal cells.
    #[arg(long, default_value_t = 80)]
    width: usize,
    /// Screen column of the prompt's left edge.
    #[arg(long, default_value_t = 0)]
    x_offset: usize,
}

fn init_tracing(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("PROMPTLINE_LOG").unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let cfg = EditorConfig::load(&workspace)?;
    tracing::debug!(workspace = %workspace.display(), "settings loaded");

    match cli.command {
        Commands::Complete(args) => run_complete(&workspace, &cfg, args, cli.json),
        Commands::Highlight(args) => run_highlight(&cfg, args, cli.json),
        Commands::Copy(args) => run_copy(&cfg, args, cli.json),
        Commands::Paste => run_paste(&cfg, cli.json),
        Commands::Navigate(args) => run_navigate(args, cli.json),
        Commands::Doctor => run_doctor(&workspace, &cfg, cli.json),
    }
}
