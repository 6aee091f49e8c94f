//! `state show` and `state resync`.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use submanager_core::state::load_dynamic_config_at;
use submanager_core::ConfigPaths;
use submanager_daemon::{reset_state, RunOptions};

use super::config::load;

#[derive(Subcommand, Debug)]
pub enum StateCommand {
    /// Show what each item last synced and its current thread.
    Show(ShowArgs),

    /// Forget recorded source revisions so the next cycle resyncs everything.
    Resync(ResyncArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ResyncArgs {
    /// Seconds to wait for another process to release the state lock.
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub lock_timeout: u64,
}

pub fn run(cmd: StateCommand, paths: &ConfigPaths) -> Result<()> {
    match cmd {
        StateCommand::Show(args) => show(args, paths),
        StateCommand::Resync(args) => resync(args, paths),
    }
}

#[derive(Debug, Serialize, Tabled)]
struct StateRow {
    manager: &'static str,
    key: String,
    #[tabled(rename = "last source revision")]
    last_synced: String,
    #[tabled(rename = "thread")]
    thread_id: String,
    #[tabled(rename = "#")]
    thread_number: String,
}

fn format_timestamp(timestamp: i64) -> String {
    if timestamp == 0 {
        return "never".to_string();
    }
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn show(args: ShowArgs, paths: &ConfigPaths) -> Result<()> {
    let config = load(paths)?;
    let state = load_dynamic_config_at(&config, &paths.dynamic_path).with_context(|| {
        format!("failed to load dynamic state at {}", paths.dynamic_path.display())
    })?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("failed to serialize state JSON")?
        );
        return Ok(());
    }

    let sync = state.sync_manager.items.iter().map(|(key, record)| StateRow {
        manager: "sync",
        key: key.clone(),
        last_synced: format_timestamp(record.source_timestamp),
        thread_id: "-".to_string(),
        thread_number: "-".to_string(),
    });
    let threads = state.thread_manager.items.iter().map(|(key, record)| StateRow {
        manager: "thread",
        key: key.clone(),
        last_synced: format_timestamp(record.sync.source_timestamp),
        thread_id: record.thread_id.clone().unwrap_or_else(|| "-".to_string()),
        thread_number: record.thread_number.to_string(),
    });
    let rows: Vec<StateRow> = sync.chain(threads).collect();
    if rows.is_empty() {
        println!("No items configured.");
        return Ok(());
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn resync(args: ResyncArgs, paths: &ConfigPaths) -> Result<()> {
    let config = load(paths)?;
    let options = RunOptions {
        lock_timeout: Duration::from_secs(args.lock_timeout),
        ..RunOptions::default()
    };
    let summary = reset_state(&config, &paths.dynamic_path, &options)
        .context("failed to reset dynamic state")?;
    if summary.state_saved {
        println!(
            "✓ Reset source timestamps in {}; the next cycle resyncs every item",
            paths.dynamic_path.display()
        );
    } else {
        println!("Nothing to reset; no item has synced yet.");
    }
    Ok(())
}
