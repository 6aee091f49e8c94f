//! One manage cycle: lock, load, sync, rotate, save.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use submanager_core::lock::{LockGuard, LOCK_POLL_INTERVAL, LOCK_TIMEOUT};
use submanager_core::state::{load_dynamic_config_at, save_dynamic_config_at};
use submanager_core::{Accounts, DynamicConfig, StaticConfig, ThreadManagerConfig};
use submanager_sync::{sync_all, SyncItemResult, SyncOutcome};
use submanager_thread::{manage_threads_at, ThreadItemResult, ThreadOutcome};

use crate::error::DaemonError;

/// Knobs for a single cycle.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Forget every recorded source revision before syncing.
    pub resync_all: bool,
    /// Thread item keys to rotate regardless of their interval.
    pub force_threads: Vec<String>,
    pub lock_timeout: Duration,
    pub lock_poll: Duration,
    /// Clock used for rotation decisions; `None` means the wall clock.
    pub now: Option<DateTime<Utc>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            resync_all: false,
            force_threads: Vec::new(),
            lock_timeout: LOCK_TIMEOUT,
            lock_poll: LOCK_POLL_INTERVAL,
            now: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerKind {
    Sync,
    Thread,
}

/// What happened to one configured item in a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub manager: ManagerKind,
    pub key: String,
    pub uid: String,
    pub ok: bool,
    pub detail: String,
}

impl ItemReport {
    fn from_sync(result: SyncItemResult) -> Self {
        let (ok, detail) = match &result.result {
            Ok(outcome) => (true, describe_sync(outcome)),
            Err(err) => (false, err.to_string()),
        };
        Self {
            manager: ManagerKind::Sync,
            key: result.key,
            uid: result.uid,
            ok,
            detail,
        }
    }

    fn from_thread(result: ThreadItemResult) -> Self {
        let (ok, detail) = match &result.result {
            Ok(ThreadOutcome::Disabled) => (true, "disabled".to_string()),
            Ok(ThreadOutcome::Created(new)) => (
                true,
                format!("posted thread #{} as {}", new.thread_number, new.thread.id),
            ),
            Ok(ThreadOutcome::Synced(outcome)) => (true, describe_sync(outcome)),
            Err(err) => (false, err.to_string()),
        };
        Self {
            manager: ManagerKind::Thread,
            key: result.key,
            uid: result.uid,
            ok,
            detail,
        }
    }
}

fn describe_sync(outcome: &SyncOutcome) -> String {
    match outcome {
        SyncOutcome::Disabled => "disabled".to_string(),
        SyncOutcome::SourceSkipped => "source unchanged".to_string(),
        SyncOutcome::Synced(targets) => {
            format!("{} of {} targets written", outcome.written(), targets.len())
        }
    }
}

/// Per-item results of one cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleSummary {
    pub items: Vec<ItemReport>,
    /// Whether the dynamic state changed and was written back.
    pub state_saved: bool,
    pub duration_ms: u128,
}

impl CycleSummary {
    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items.iter().filter(|item| !item.ok)
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Run every enabled manager once against the state at `dynamic_path`.
///
/// The lock is held for the whole cycle and released on return, error or
/// panic. Item failures are reported in the summary, not returned.
pub fn run_manage_once(
    config: &StaticConfig,
    accounts: &Accounts,
    dynamic_path: &Path,
    options: &RunOptions,
) -> Result<CycleSummary, DaemonError> {
    locked_cycle(config, dynamic_path, options, |state, summary| {
        if config.sync_manager.enabled {
            let results = sync_all(&config.sync_manager, &mut state.sync_manager, accounts);
            summary
                .items
                .extend(results.into_iter().map(ItemReport::from_sync));
        }
        if config.thread_manager.enabled {
            let results = manage_threads_at(
                &config.thread_manager,
                &mut state.thread_manager,
                accounts,
                options.now.unwrap_or_else(Utc::now),
                &options.force_threads,
            );
            summary
                .items
                .extend(results.into_iter().map(ItemReport::from_thread));
        }
    })
}

/// Post a new thread for each of `keys` now, skipping the sync manager.
///
/// Every key must name a configured thread item. Items run even if the
/// thread manager is disabled.
pub fn run_cycle_threads(
    config: &StaticConfig,
    accounts: &Accounts,
    dynamic_path: &Path,
    keys: &[String],
    options: &RunOptions,
) -> Result<CycleSummary, DaemonError> {
    let known = &config.thread_manager.items;
    let unknown: Vec<String> = keys
        .iter()
        .filter(|key| !known.contains_key(key.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(DaemonError::UnknownThreadKeys {
            unknown,
            known: known.keys().cloned().collect(),
        });
    }

    let selected = ThreadManagerConfig {
        enabled: true,
        items: known
            .iter()
            .filter(|(key, _)| keys.contains(key))
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect(),
    };
    locked_cycle(config, dynamic_path, options, |state, summary| {
        let results = manage_threads_at(
            &selected,
            &mut state.thread_manager,
            accounts,
            options.now.unwrap_or_else(Utc::now),
            keys,
        );
        summary
            .items
            .extend(results.into_iter().map(ItemReport::from_thread));
    })
}

/// Zero every recorded source revision under the lock so the next cycle
/// resyncs all items.
pub fn reset_state(
    config: &StaticConfig,
    dynamic_path: &Path,
    options: &RunOptions,
) -> Result<CycleSummary, DaemonError> {
    let options = RunOptions {
        resync_all: true,
        ..options.clone()
    };
    locked_cycle(config, dynamic_path, &options, |_, _| {})
}

fn locked_cycle(
    config: &StaticConfig,
    dynamic_path: &Path,
    options: &RunOptions,
    work: impl FnOnce(&mut DynamicConfig, &mut CycleSummary),
) -> Result<CycleSummary, DaemonError> {
    let started = Instant::now();
    let _guard = LockGuard::acquire(dynamic_path, options.lock_timeout, options.lock_poll)?;

    let loaded = load_dynamic_config_at(config, dynamic_path)?;
    let mut state = loaded.clone();
    if options.resync_all {
        state.reset_timestamps();
    }

    let mut summary = CycleSummary::default();
    work(&mut state, &mut summary);

    if state != loaded {
        save_dynamic_config_at(dynamic_path, &state)?;
        summary.state_saved = true;
    }
    summary.duration_ms = started.elapsed().as_millis();
    tracing::info!(
        items = summary.items.len(),
        failures = summary.failures().count(),
        saved = summary.state_saved,
        duration_ms = summary.duration_ms as u64,
        "manage cycle complete",
    );
    Ok(summary)
}
