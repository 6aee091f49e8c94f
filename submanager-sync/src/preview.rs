//! Dry-run preview of what `sync_one` would write.

use serde::Serialize;
use similar::TextDiff;

use submanager_core::{Accounts, DynamicSyncState, MenuData, SyncItem};

use crate::endpoint::{Content, Endpoint};
use crate::error::SyncError;
use crate::process::{plan_target, process_source};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum PreviewChange {
    /// Nothing would be written.
    None { reason: String },
    Text { unified_diff: String },
    Menu { before: Content, after: MenuData },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetPreview {
    pub key: String,
    pub uid: String,
    pub change: PreviewChange,
}

fn skipped(reason: &str) -> PreviewChange {
    PreviewChange::None {
        reason: reason.to_string(),
    }
}

/// Compute per-target changes without writing anything.
///
/// `state` is not modified; an empty result means the source would be
/// skipped (unchanged revision, missing markers, or item disabled).
pub fn preview_one(
    item: &SyncItem,
    state: &DynamicSyncState,
    accounts: &Accounts,
) -> Result<Vec<TargetPreview>, SyncError> {
    if !(item.enabled && item.source.enabled) {
        return Ok(Vec::new());
    }
    if item.targets.is_empty() {
        return Err(SyncError::NoTargets {
            uid: item.uid.clone(),
        });
    }

    let mut scratch = *state;
    let source = Endpoint::resolve(&item.source.endpoint, accounts)?;
    let Some(content) = process_source(&item.source, &source, &mut scratch)? else {
        return Ok(Vec::new());
    };

    let mut previews = Vec::with_capacity(item.targets.len());
    for (key, target_config) in &item.targets {
        let change = if !target_config.enabled {
            skipped("disabled")
        } else {
            let target = Endpoint::resolve(&target_config.endpoint, accounts)?;
            match plan_target(target_config, &target, &content, &item.source.menu_config)? {
                None => skipped("sync pattern not found"),
                Some(plan) if plan.is_noop() => skipped("unchanged"),
                Some(plan) => match (plan.current, plan.new) {
                    (Content::Text(before), Content::Text(after)) => PreviewChange::Text {
                        unified_diff: TextDiff::from_lines(&before, &after)
                            .unified_diff()
                            .header(&format!("a/{}", target_config.uid()), &format!("b/{}", target_config.uid()))
                            .context_radius(3)
                            .to_string(),
                    },
                    (before, Content::Menu(after)) => PreviewChange::Menu { before, after },
                    (_, Content::Text(_)) => skipped("unchanged"),
                },
            }
        };
        previews.push(TargetPreview {
            key: key.clone(),
            uid: target_config.uid().to_string(),
            change,
        });
    }
    Ok(previews)
}
