//! Per-cycle thread management: rotate when due, otherwise keep the current
//! thread in sync with its source.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use submanager_core::state::DynamicThreadManager;
use submanager_core::{
    Accounts, DynamicThreadState, EndpointConfig, EndpointType, FullEndpointConfig, SyncItem,
    ThreadItem, ThreadManagerConfig,
};
use submanager_sync::{sync_one, SyncOutcome};

use crate::error::{platform_err, ThreadError};
use crate::interval::should_rotate;
use crate::lifecycle::{create_new_thread, platform_for, thread_pattern, NewThread};

/// What happened to one thread item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    Disabled,
    Created(NewThread),
    Synced(SyncOutcome),
}

/// Result of one item inside [`manage_threads`].
#[derive(Debug)]
pub struct ThreadItemResult {
    pub key: String,
    pub uid: String,
    pub result: Result<ThreadOutcome, ThreadError>,
}

/// The one-target sync item that keeps the current thread's body in step
/// with the source.
pub fn thread_sync_item(item: &ThreadItem, thread_id: &str) -> SyncItem {
    let mut endpoint = EndpointConfig::new(
        format!("{}.target", item.uid),
        item.target_context.clone(),
        thread_id,
        EndpointType::Thread,
    );
    endpoint.description = Some(format!("{} Thread", item.label()));
    let mut target = FullEndpointConfig::new(endpoint);
    target.pattern = thread_pattern(item);

    let mut targets = IndexMap::new();
    targets.insert("managed_thread".to_string(), target);
    SyncItem {
        uid: format!("{}.sync_item", item.uid),
        description: item.description.clone(),
        enabled: true,
        source: item.source.clone(),
        targets,
    }
}

/// Sync the source into the current thread.
pub fn sync_thread(
    item: &ThreadItem,
    state: &mut DynamicThreadState,
    accounts: &Accounts,
) -> Result<SyncOutcome, ThreadError> {
    let thread_id = state
        .thread_id
        .clone()
        .ok_or_else(|| ThreadError::MissingThreadId {
            uid: item.uid.clone(),
        })?;
    let sync_item = thread_sync_item(item, &thread_id);
    Ok(sync_one(&sync_item, &mut state.sync, accounts)?)
}

pub fn manage_thread(
    item: &ThreadItem,
    state: &mut DynamicThreadState,
    accounts: &Accounts,
) -> Result<ThreadOutcome, ThreadError> {
    manage_thread_at(item, state, accounts, Utc::now(), false)
}

/// [`manage_thread`] at a given time; `force_new` rotates regardless of the
/// interval.
pub fn manage_thread_at(
    item: &ThreadItem,
    state: &mut DynamicThreadState,
    accounts: &Accounts,
    now: DateTime<Utc>,
    force_new: bool,
) -> Result<ThreadOutcome, ThreadError> {
    if !item.enabled {
        return Ok(ThreadOutcome::Disabled);
    }

    let rotate = force_new || {
        let current = match (&item.new_thread_interval, state.thread_id.as_deref()) {
            (Some(_), Some(id)) => {
                let moderator = platform_for(accounts, &item.context.account, &item.uid)?;
                Some(moderator.submission(id).map_err(platform_err(&item.uid))?)
            }
            _ => None,
        };
        should_rotate(item, state, current.as_ref(), now)
    };

    if rotate {
        tracing::info!("{}: creating new thread", item.uid);
        return Ok(ThreadOutcome::Created(create_new_thread(item, state, accounts, now)?));
    }
    Ok(ThreadOutcome::Synced(sync_thread(item, state, accounts)?))
}

pub fn manage_threads(
    config: &ThreadManagerConfig,
    state: &mut DynamicThreadManager,
    accounts: &Accounts,
) -> Vec<ThreadItemResult> {
    manage_threads_at(config, state, accounts, Utc::now(), &[])
}

/// Manage every thread item, forcing rotation for the keys in `force_new`.
///
/// Each item works on a copy of its state record, committed on success or
/// once a new thread has been posted.
pub fn manage_threads_at(
    config: &ThreadManagerConfig,
    state: &mut DynamicThreadManager,
    accounts: &Accounts,
    now: DateTime<Utc>,
    force_new: &[String],
) -> Vec<ThreadItemResult> {
    if !config.enabled {
        return Vec::new();
    }
    let mut results = Vec::with_capacity(config.items.len());
    for (key, item) in &config.items {
        let mut record = state
            .items
            .get(key)
            .cloned()
            .unwrap_or_else(|| DynamicThreadState::seeded(&item.initial));
        let force = force_new.iter().any(|k| k == key);
        let result = manage_thread_at(item, &mut record, accounts, now, force);
        match &result {
            Ok(_) => {
                state.items.insert(key.clone(), record);
            }
            Err(err) => {
                tracing::warn!("thread item {} failed: {err}", item.uid);
                if err.posted_thread().is_some() {
                    state.items.insert(key.clone(), record);
                }
            }
        }
        results.push(ThreadItemResult {
            key: key.clone(),
            uid: item.uid.clone(),
            result,
        });
    }
    results
}
