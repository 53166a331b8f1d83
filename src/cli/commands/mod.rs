//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod corpus;
mod preprocess;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "debates")]
#[command(about = "UN General Debate corpus preprocessing and exploration")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, global = true, env = "DEBATES_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

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
    /// Build the speech table, paragraph table and annotation blob from the raw corpus
    Preprocess {
        /// Documents per annotation batch (default from config, or 20)
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Show corpus statistics
    Stats,

    /// Show one speech and its paragraphs
    Show {
        /// Document ID of the speech
        document_id: String,
        /// Decode the speech's annotation and show token counts
        #[arg(short, long)]
        annotations: bool,
    },

    /// Decode every speech's annotation up front
    Preload,

    /// Append a column to the paragraph table (one value per line)
    AppendColumn {
        /// Column name
        name: String,
        /// File with one value per paragraph row
        values_file: PathBuf,
    },

    /// Check paragraph ordering, id uniqueness and annotation coverage
    Check,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved settings
    Show,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        data_dir: cli.data_dir,
    };
    let (settings, config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Preprocess { batch_size } => {
            preprocess::cmd_preprocess(&settings, batch_size).await
        }
        Commands::Stats => corpus::cmd_stats(&settings).await,
        Commands::Show {
            document_id,
            annotations,
        } => corpus::cmd_show(&settings, &document_id, annotations).await,
        Commands::Preload => corpus::cmd_preload(&settings).await,
        Commands::AppendColumn { name, values_file } => {
            corpus::cmd_append_column(&settings, &name, &values_file).await
        }
        Commands::Check => corpus::cmd_check(&settings).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&settings, &config).await,
        },
    }
}
