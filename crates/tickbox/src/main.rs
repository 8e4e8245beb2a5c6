//! CLI entry point for tickbox.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tickbox_app::{FileConfig, StoreConfig};
use tickbox_core::Filter;
use tickbox_storage::StorageMedium;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// A small persisted to-do list.
#[derive(Parser, Debug)]
#[command(name = "tickbox", version, about = "tickbox: a persisted to-do list")]
struct Cli {
    /// Configuration file (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage medium override: durable, session or memory.
    #[arg(long)]
    medium: Option<StorageMedium>,

    /// Storage key override.
    #[arg(long)]
    key: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a task.
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Flip a task between open and done.
    Toggle { id: String },

    /// Rename a task.
    Rename { id: String, name: String },

    /// Rename a task and replace its description (an empty one clears it).
    Edit {
        id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a task.
    Rm { id: String },

    /// Delete every completed task.
    ClearCompleted,

    /// Delete every task.
    Clear,

    /// Set the list filter.
    Filter { filter: Filter },

    /// Mark every task done, or reopen all when everything is done already.
    ToggleAll {
        /// Force every task to this completion flag.
        #[arg(long)]
        done: Option<bool>,
    },

    /// Move the task at one position to another (zero-based).
    Move { from: usize, to: usize },

    /// List tasks matching the current filter.
    Ls {
        /// Ignore the filter.
        #[arg(long)]
        all: bool,
    },

    /// Show counts and completion.
    Stats,

    /// Print every task as JSON.
    Export,

    /// Append tasks from a JSON file produced by `export`.
    Import { file: PathBuf },

    /// Delete the persisted list.
    Reset,
}

fn main() -> Result<()> {
    let Cli {
        config,
        medium,
        key,
        cmd,
    } = Cli::parse();
    install_tracing();

    let store_config = resolve_config(config, medium, key)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    commands::run(cmd, store_config, &mut out)?;
    out.flush().context("failed to flush stdout")
}

fn resolve_config(path: Option<PathBuf>, medium: Option<StorageMedium>, key: Option<String>) -> Result<StoreConfig> {
    let file = match path.or_else(FileConfig::default_path) {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let mut config = file.apply_to(StoreConfig::default());
    if let Some(medium) = medium {
        config.storage_medium = medium;
    }
    if let Some(key) = key {
        anyhow::ensure!(!key.trim().is_empty(), "--key must not be blank");
        config.persist_key = key.trim().to_owned();
    }
    Ok(config)
}

fn install_tracing() {
    // RUST_LOG overrides the default of warnings only; output goes to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}
