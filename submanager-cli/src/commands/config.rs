//! `generate-config`, `validate-config` and `get-config-info`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use submanager_core::config::{generate_static_config_at, load_static_config_at};
use submanager_core::{ConfigPaths, FullEndpointConfig, StaticConfig};
use submanager_daemon::check_templates;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,

    /// Succeed without changes if the config file already exists.
    #[arg(long, conflicts_with = "force")]
    pub exist_ok: bool,
}

impl GenerateArgs {
    pub fn run(self, paths: &ConfigPaths) -> Result<()> {
        let path = &paths.static_path;
        let written = generate_static_config_at(path, self.force, self.exist_ok)
            .with_context(|| format!("failed to generate config at {}", path.display()))?;
        if written {
            println!("✓ Wrote example config to {}", path.display());
            println!("Edit it, then run `submanager validate-config`.");
        } else {
            println!("Config already exists at {}; left unchanged.", path.display());
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    pub fn run(self, paths: &ConfigPaths) -> Result<()> {
        let config = load(paths)?;
        check_templates(&config.thread_manager)
            .with_context(|| format!("invalid template in {}", paths.static_path.display()))?;
        println!(
            "✓ Config at {} is valid: {} accounts, {} sync items, {} thread items",
            paths.static_path.display(),
            config.accounts.len(),
            config.sync_manager.items.len(),
            config.thread_manager.items.len(),
        );
        Ok(())
    }
}

pub(crate) fn load(paths: &ConfigPaths) -> Result<StaticConfig> {
    load_static_config_at(&paths.static_path)
        .with_context(|| format!("invalid config at {}", paths.static_path.display()))
}

// ---------------------------------------------------------------------------
// get-config-info
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// List every source and target endpoint instead of one row per item.
    #[arg(long)]
    pub endpoints: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct ItemRow {
    manager: &'static str,
    key: String,
    uid: String,
    enabled: bool,
    description: String,
    source: String,
    targets: usize,
}

#[derive(Debug, Serialize, Tabled)]
struct EndpointRow {
    uid: String,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    endpoint_type: &'static str,
    account: String,
    subreddit: String,
    name: String,
    pattern: String,
}

impl InfoArgs {
    pub fn run(self, paths: &ConfigPaths) -> Result<()> {
        let config = load(paths)?;
        if self.endpoints {
            let rows = endpoint_rows(&config);
            if self.json {
                return print_json(&rows);
            }
            print_table(rows);
        } else {
            let rows = item_rows(&config);
            if self.json {
                return print_json(&rows);
            }
            print_table(rows);
        }
        Ok(())
    }
}

fn item_rows(config: &StaticConfig) -> Vec<ItemRow> {
    let sync = config.sync_manager.items.iter().map(|(key, item)| ItemRow {
        manager: "sync",
        key: key.clone(),
        uid: item.uid.clone(),
        enabled: config.sync_manager.enabled && item.enabled,
        description: item.label().to_string(),
        source: item.source.endpoint.endpoint_name.clone(),
        targets: item.targets.len(),
    });
    let threads = config.thread_manager.items.iter().map(|(key, item)| ItemRow {
        manager: "thread",
        key: key.clone(),
        uid: item.uid.clone(),
        enabled: config.thread_manager.enabled && item.enabled,
        description: item.label().to_string(),
        source: item.source.endpoint.endpoint_name.clone(),
        targets: 1,
    });
    sync.chain(threads).collect()
}

fn endpoint_rows(config: &StaticConfig) -> Vec<EndpointRow> {
    let mut rows = Vec::new();
    for item in config.sync_manager.items.values() {
        rows.push(endpoint_row(&item.source));
        rows.extend(item.targets.values().map(endpoint_row));
    }
    for item in config.thread_manager.items.values() {
        rows.push(endpoint_row(&item.source));
    }
    rows
}

fn endpoint_row(endpoint: &FullEndpointConfig) -> EndpointRow {
    let config = &endpoint.endpoint;
    EndpointRow {
        uid: config.uid.clone(),
        endpoint_type: config.endpoint_type.as_str(),
        account: config.context.account.clone(),
        subreddit: config.context.subreddit.clone(),
        name: config.endpoint_name.clone(),
        pattern: endpoint.pattern.pattern.clone().unwrap_or_else(|| "-".to_string()),
    }
}

fn print_json<T: Serialize>(rows: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(rows).context("failed to serialize config info")?
    );
    Ok(())
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items configured.".yellow());
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
