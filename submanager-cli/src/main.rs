//! Sub Manager: keep subreddit wiki pages, widgets, menus and recurring
//! threads in sync.
//!
//! # Usage
//!
//! ```text
//! submanager generate-config [--force] [--exist-ok]
//! submanager validate-config
//! submanager get-config-info [--endpoints] [--json]
//! submanager state show [--json]
//! submanager state resync [--lock-timeout <secs>]
//! ```
//!
//! Every command accepts `--config-path` and `--dynamic-path`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    config::{GenerateArgs, InfoArgs, ValidateArgs},
    state::StateCommand,
};
use submanager_core::ConfigPaths;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "submanager",
    version,
    about = "Sync subreddit content and manage recurring threads",
    long_about = None,
)]
struct Cli {
    /// Static config file (YAML).
    #[arg(long, global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    /// Dynamic state file (JSON).
    #[arg(long, global = true, value_name = "PATH")]
    dynamic_path: Option<PathBuf>,

    /// Print log lines (filter with RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write an example config file to edit.
    GenerateConfig(GenerateArgs),

    /// Load, render and validate the config file.
    ValidateConfig(ValidateArgs),

    /// List the configured items and their endpoints.
    GetConfigInfo(InfoArgs),

    /// Inspect or reset the dynamic state.
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

/// Explicit paths win; otherwise fall back to the platform directories.
fn resolve_paths(config_path: Option<PathBuf>, dynamic_path: Option<PathBuf>) -> Result<ConfigPaths> {
    match (config_path, dynamic_path) {
        (Some(static_path), Some(dynamic_path)) => Ok(ConfigPaths {
            static_path,
            dynamic_path,
        }),
        (static_path, dynamic_path) => Ok(ConfigPaths::default_paths()
            .context("failed to determine default config locations; pass --config-path and --dynamic-path")?
            .with_overrides(static_path, dynamic_path)),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        submanager_daemon::init_tracing(false);
    }
    let paths = resolve_paths(cli.config_path, cli.dynamic_path)?;
    match cli.command {
        Commands::GenerateConfig(args) => args.run(&paths),
        Commands::ValidateConfig(args) => args.run(&paths),
        Commands::GetConfigInfo(args) => args.run(&paths),
        Commands::State { command } => commands::state::run(command, &paths),
    }
}
