//! Dynamic state: what each item has already seen and done.
//!
//! Persisted as JSON next to (or apart from) the static config. Writes use the
//! same atomic `.tmp` + rename pattern as the static config. The manage cycle
//! owns the [`DynamicConfig`] for a run and hands out `&mut` references to one
//! item record at a time.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::write_private_atomic;
use crate::error::{io_err, ConfigError};
use crate::types::{false_as_none, InitialThreadConfig, StaticConfig};

/// Per sync item; also embedded in [`DynamicThreadState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSyncState {
    /// Last source revision date acted on, epoch seconds. `0` = never synced.
    #[serde(default)]
    pub source_timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicThreadState {
    #[serde(flatten)]
    pub sync: DynamicSyncState,
    #[serde(default, deserialize_with = "false_as_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub thread_number: u64,
}

impl DynamicThreadState {
    pub fn seeded(initial: &InitialThreadConfig) -> Self {
        Self {
            sync: DynamicSyncState::default(),
            thread_id: initial.thread_id.clone(),
            thread_number: initial.thread_number,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSyncManager {
    #[serde(default)]
    pub items: IndexMap<String, DynamicSyncState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicThreadManager {
    #[serde(default)]
    pub items: IndexMap<String, DynamicThreadState>,
}

/// Whole dynamic state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicConfig {
    #[serde(default)]
    pub sync_manager: DynamicSyncManager,
    #[serde(default)]
    pub thread_manager: DynamicThreadManager,
}

impl DynamicConfig {
    /// Add a record for every configured item that lacks one.
    ///
    /// Thread records are seeded from the item's `initial` block. Records of
    /// items no longer in the static config are kept untouched.
    pub fn fill_missing(&mut self, config: &StaticConfig) {
        for key in config.sync_manager.items.keys() {
            self.sync_manager.items.entry(key.clone()).or_default();
        }
        for (key, item) in &config.thread_manager.items {
            self.thread_manager
                .items
                .entry(key.clone())
                .or_insert_with(|| DynamicThreadState::seeded(&item.initial));
        }
    }

    /// Forget every observed revision so the next cycle resyncs everything.
    pub fn reset_timestamps(&mut self) {
        for state in self.sync_manager.items.values_mut() {
            state.source_timestamp = 0;
        }
        for state in self.thread_manager.items.values_mut() {
            state.sync.source_timestamp = 0;
        }
    }
}

/// Load the dynamic state at `path`, or start empty if it does not exist yet,
/// then fill in records for every item in `config`.
pub fn load_dynamic_config_at(config: &StaticConfig, path: &Path) -> Result<DynamicConfig, ConfigError> {
    let mut state = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        if contents.trim().is_empty() {
            DynamicConfig::default()
        } else {
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseState {
                path: path.to_path_buf(),
                source: e,
            })?
        }
    } else {
        DynamicConfig::default()
    };
    state.fill_missing(config);
    Ok(state)
}

/// Atomically save the dynamic state to `path`.
pub fn save_dynamic_config_at(path: &Path, state: &DynamicConfig) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(state)?;
    write_private_atomic(path, &json)
}
