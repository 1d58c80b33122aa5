//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod annotate;
mod check;
mod config_cmd;
mod extract;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use storyarc::config::Config;
use storyarc::output::OutputFormat;

#[derive(Parser)]
#[command(name = "storyarc")]
#[command(about = "Narrative-arc annotation for public-domain short stories")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Clean every story and send it to the LLM for segmentation
    Annotate(AnnotateArgs),

    /// Show what the narrative extractor keeps
    Extract {
        /// CSV dataset (overrides config)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        /// Print the cleaned text of a single row
        #[arg(short, long)]
        row: Option<usize>,
        /// Write all cleaned stories to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report how many saved responses parse as four-phase segmentations
    Check {
        /// Output file to check (defaults to the configured output)
        file: Option<PathBuf>,
        /// File format (inferred from extension if omitted)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Args, Debug, Default)]
pub struct AnnotateArgs {
    /// CSV dataset (overrides config)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,
    /// Output file (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Output format (inferred from extension if omitted)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
    /// First dataset row to process (0-based)
    #[arg(long)]
    pub start: Option<usize>,
    /// Maximum number of stories to process (0 = unlimited)
    #[arg(short, long)]
    pub limit: Option<usize>,
    /// Skip stories longer than this many characters
    #[arg(long)]
    pub char_limit: Option<usize>,
    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,
    /// LLM API endpoint (overrides config)
    #[arg(short, long)]
    pub endpoint: Option<String>,
    /// Keep entries already in the output file
    #[arg(short, long)]
    pub append: bool,
    /// Extra attempts for transient failures
    #[arg(long)]
    pub retries: Option<u32>,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from_path(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().await,
    };

    match cli.command {
        Commands::Annotate(args) => annotate::cmd_annotate(config, args).await,
        Commands::Extract {
            dataset,
            row,
            output,
        } => extract::cmd_extract(&config, dataset, row, output),
        Commands::Check { file, format } => check::cmd_check(&config, file, format),
        Commands::Config => config_cmd::cmd_config(&config),
    }
}
