//! Terminal player for Storyloom story documents.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "loom",
    about = "Storyloom: check, inspect and play branching story documents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log engine decisions to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a story document and report structural problems
    Check {
        /// Path to the story JSON file
        file: PathBuf,
    },

    /// Summarize stages, chapters and variables
    Show {
        /// Path to the story JSON file
        file: PathBuf,
    },

    /// Play a story interactively on the terminal
    Play {
        /// Path to the story JSON file
        file: PathBuf,

        /// Stage to start in (default: the first stage)
        #[arg(short, long)]
        stage: Option<String>,

        /// Chapter to start in (default: the first chapter of the stage)
        #[arg(short, long)]
        chapter: Option<String>,

        /// Maximum number of backlog entries kept
        #[arg(long)]
        history_limit: Option<usize>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { file } => commands::check::run(&file),
        Commands::Show { file } => commands::show::run(&file),
        Commands::Play {
            file,
            stage,
            chapter,
            history_limit,
        } => commands::play::run(&file, stage.as_deref(), chapter.as_deref(), history_limit),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
