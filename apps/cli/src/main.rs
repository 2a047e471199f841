//! patchkit - content-addressed binary patching for large installation trees.
//!
//! Chunks a source tree into content-defined blocks, packs them into
//! bundles with stable identity across versions, and applies the minimal
//! fetch set against an existing install.

use clap::{Parser, Subcommand};
use patchkit::commands;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchkit")]
#[command(about = "Content-addressed binary patching for large installation trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build patch data (blocks, bundles, manifest) from a source directory.
    Create {
        /// Directory to chunk and bundle.
        directory: PathBuf,

        /// Directory to write blocks/, bundles/, patchData.json into.
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Prior patch data directory to reuse bundles from (defaults to `output`).
        #[arg(long)]
        patch_data: Option<PathBuf>,

        /// Target average block size in bytes.
        #[arg(long, default_value_t = 65536)]
        block_size: u64,

        /// Compress blocks with a trained Zstandard dictionary.
        #[arg(long)]
        compress: bool,

        /// Zstandard compression level.
        #[arg(long, default_value_t = 5)]
        compression_level: i32,

        /// Path to an existing dictionary to reuse, or where a trained one is written.
        #[arg(long)]
        dict_path: Option<PathBuf>,

        /// Force dictionary retraining even if one already exists at dict-path.
        #[arg(long)]
        regen_dict: bool,
    },

    /// Apply patch data to an install root, fetching only what's missing locally.
    Apply {
        /// Root directory containing `install/` and `data/`.
        install_root: PathBuf,

        /// Patch data source: a local directory or an HTTP(S) base URL.
        #[arg(long)]
        patch_data: String,
    },

    /// Check whether every tracked file in an install root matches its changelog entry.
    Validate {
        /// Root directory containing `install/` and `data/`.
        install_root: PathBuf,
    },

    /// Get, set, unset, or list persistent configuration defaults.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the value of a configuration key.
    Get { key: String },
    /// Set a configuration key to a value.
    Set { key: String, value: String },
    /// Remove a configuration key, restoring its default.
    Unset { key: String },
    /// List all configuration keys and values.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            directory,
            output,
            patch_data,
            block_size,
            compress,
            compression_level,
            dict_path,
            regen_dict,
        } => commands::run_create(
            &directory,
            &output,
            patch_data.as_deref(),
            block_size,
            compress,
            compression_level,
            dict_path,
            regen_dict,
        ),
        Commands::Apply { install_root, patch_data } => {
            commands::run_apply(&install_root, &patch_data).await
        }
        Commands::Validate { install_root } => commands::run_validate(&install_root),
        Commands::Config { action } => {
            let action = match action {
                ConfigCommand::Get { key } => commands::ConfigAction::Get(key),
                ConfigCommand::Set { key, value } => commands::ConfigAction::Set(key, value),
                ConfigCommand::Unset { key } => commands::ConfigAction::Unset(key),
                ConfigCommand::List => commands::ConfigAction::List,
            };
            commands::run_config(action)
        }
    }
}
