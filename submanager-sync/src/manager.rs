//! Sync one source into its targets, for one item or a whole manager.

use submanager_core::state::DynamicSyncManager;
use submanager_core::{Accounts, DynamicSyncState, SyncItem, SyncManagerConfig};

use crate::endpoint::Endpoint;
use crate::error::SyncError;
use crate::process::{plan_target, process_source};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    Written,
    /// The transformed content equals what the target already holds.
    Unchanged,
    PatternNotFound,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResult {
    /// Key of the target in the item's `targets` map.
    pub key: String,
    pub uid: String,
    pub outcome: TargetOutcome,
}

/// What happened to one sync item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The item or its source is disabled.
    Disabled,
    /// Source revision not newer than last seen, or source markers missing.
    SourceSkipped,
    Synced(Vec<TargetResult>),
}

impl SyncOutcome {
    pub fn written(&self) -> usize {
        match self {
            SyncOutcome::Synced(targets) => targets
                .iter()
                .filter(|t| t.outcome == TargetOutcome::Written)
                .count(),
            _ => 0,
        }
    }
}

/// Result of one item inside [`sync_all`].
#[derive(Debug)]
pub struct SyncItemResult {
    pub key: String,
    pub uid: String,
    pub result: Result<SyncOutcome, SyncError>,
}

pub(crate) fn audit_reason(item: &SyncItem) -> String {
    format!(
        "Auto-sync {} from {}",
        item.label(),
        item.source.endpoint.endpoint_name
    )
}

// ---------------------------------------------------------------------------
// sync_one / sync_all
// ---------------------------------------------------------------------------

/// Sync one item: read the source if it changed, then update every enabled
/// target whose content would change.
///
/// Marker misses in a target skip only that target. Any other error aborts
/// the item; `state` may already hold the new source timestamp by then.
pub fn sync_one(
    item: &SyncItem,
    state: &mut DynamicSyncState,
    accounts: &Accounts,
) -> Result<SyncOutcome, SyncError> {
    if !(item.enabled && item.source.enabled) {
        return Ok(SyncOutcome::Disabled);
    }
    if item.targets.is_empty() {
        return Err(SyncError::NoTargets {
            uid: item.uid.clone(),
        });
    }

    let source = Endpoint::resolve(&item.source.endpoint, accounts)?;
    let Some(content) = process_source(&item.source, &source, state)? else {
        return Ok(SyncOutcome::SourceSkipped);
    };

    let reason = audit_reason(item);
    let mut results = Vec::with_capacity(item.targets.len());
    for (key, target_config) in &item.targets {
        let outcome = if !target_config.enabled {
            TargetOutcome::Disabled
        } else {
            let target = Endpoint::resolve(&target_config.endpoint, accounts)?;
            match plan_target(target_config, &target, &content, &item.source.menu_config)? {
                None => TargetOutcome::PatternNotFound,
                Some(plan) if plan.is_noop() => {
                    tracing::debug!("target {} already up to date", target.uid());
                    TargetOutcome::Unchanged
                }
                Some(plan) => {
                    target.edit(&plan.new, &reason)?;
                    tracing::info!("synced {} -> {}", item.uid, target.uid());
                    TargetOutcome::Written
                }
            }
        };
        results.push(TargetResult {
            key: key.clone(),
            uid: target_config.uid().to_string(),
            outcome,
        });
    }
    Ok(SyncOutcome::Synced(results))
}

/// Sync every item of the manager.
///
/// Each item works on a copy of its state record, committed only if the item
/// succeeds, so one failing item neither corrupts its own record nor stops
/// the items after it.
pub fn sync_all(
    config: &SyncManagerConfig,
    state: &mut DynamicSyncManager,
    accounts: &Accounts,
) -> Vec<SyncItemResult> {
    if !config.enabled {
        return Vec::new();
    }
    let mut results = Vec::with_capacity(config.items.len());
    for (key, item) in &config.items {
        let mut record = state.items.get(key).copied().unwrap_or_default();
        let result = sync_one(item, &mut record, accounts);
        match &result {
            Ok(_) => {
                state.items.insert(key.clone(), record);
            }
            Err(err) => tracing::warn!("sync item {} failed: {err}", item.uid),
        }
        results.push(SyncItemResult {
            key: key.clone(),
            uid: item.uid.clone(),
            result,
        });
    }
    results
}
