use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;

use submanager_core::memory::{Call, MemoryPlatform, Op};
use submanager_core::platform::Submission;
use submanager_core::state::DynamicThreadManager;
use submanager_core::types::InitialThreadConfig;
use submanager_core::{
    Accounts, ContextConfig, DynamicThreadState, EndpointConfig, EndpointType, FullEndpointConfig,
    Interval, IntervalUnit, PatternConfig, PinMode, PlatformError, ThreadItem, ThreadManagerConfig,
};
use submanager_sync::{SyncOutcome, TargetOutcome};
use submanager_thread::{
    check_templates, create_new_thread, manage_thread_at, manage_threads_at, sync_thread,
    ThreadError, ThreadOutcome,
};

const SUB: &str = "testsub";

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn setup() -> (MemoryPlatform, Accounts) {
    let bot = MemoryPlatform::new("bot");
    bot.add_subreddit(SUB, &["bot"]);
    bot.set_now(at(2024, 3, 5).timestamp());
    bot.put_wiki_page(
        SUB,
        "discussion_thread",
        "Intro\n[](/# Thread Start)\nWelcome to the **thread**.\n[](/# Thread End)\nOutro",
        at(2024, 3, 1).timestamp(),
    );
    let accounts = Accounts::new().with("bot", Arc::new(bot.clone()));
    (bot, accounts)
}

fn context() -> ContextConfig {
    ContextConfig {
        account: "bot".to_string(),
        subreddit: SUB.to_string(),
    }
}

fn thread_item() -> ThreadItem {
    let mut source = FullEndpointConfig::new(EndpointConfig::new(
        "thread_manager.items.discussion.source",
        context(),
        "discussion_thread",
        EndpointType::WikiPage,
    ));
    source.pattern = PatternConfig::with_pattern("Thread");
    ThreadItem {
        uid: "thread_manager.items.discussion".to_string(),
        description: Some("Discussion".to_string()),
        enabled: true,
        context: context(),
        target_context: context(),
        source,
        approve_new: true,
        initial: InitialThreadConfig::default(),
        link_update_pages: Vec::new(),
        new_thread_interval: Some(Interval {
            unit: IntervalUnit::Month,
            n: None,
        }),
        pin_mode: PinMode::Auto,
        pin_settle_ms: 0,
        post_title_template: None,
        redirect_op: false,
        redirect_sticky: false,
        redirect_template: None,
    }
}

/// A state whose current thread is an existing self post by the bot.
fn with_previous(bot: &MemoryPlatform) -> (Submission, DynamicThreadState) {
    let old = bot.add_selfpost(SUB, "Old thread", "Old body");
    let state = DynamicThreadState {
        thread_id: Some(old.id.clone()),
        thread_number: 4,
        ..DynamicThreadState::default()
    };
    (old, state)
}

fn created(outcome: ThreadOutcome) -> submanager_thread::NewThread {
    match outcome {
        ThreadOutcome::Created(new) => new,
        other => panic!("expected Created, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn first_run_posts_thread_from_source() {
    let (bot, accounts) = setup();
    let item = thread_item();
    let mut state = DynamicThreadState::default();

    let new = created(manage_thread_at(&item, &mut state, &accounts, at(2024, 3, 5), false).unwrap());

    assert_eq!(new.thread_number, 1);
    assert_eq!(new.previous_id, None);
    assert!(!new.pinned);
    assert_eq!(new.thread.title, "testsub Discussion Thread (#1)");
    assert_eq!(
        bot.post(&new.thread.id).unwrap().selftext,
        "[](/# Auto Sync Start)\n\nWelcome to the **thread**.\n\n[](/# Auto Sync End)"
    );
    assert_eq!(bot.inbox_replies(&new.thread.id), Some(false));
    assert!(bot.is_approved(&new.thread.id));

    assert_eq!(state.thread_id.as_deref(), Some(new.thread.id.as_str()));
    assert_eq!(state.thread_number, 1);
    assert_eq!(state.sync.source_timestamp, at(2024, 3, 1).timestamp());
}

#[test]
fn custom_title_template_sees_thread_number() {
    let (_bot, accounts) = setup();
    let mut item = thread_item();
    item.post_title_template = Some("Weekly #{{ thread_number }} (was #{{ thread_number_previous }})".into());
    let mut state = DynamicThreadState {
        thread_number: 9,
        ..DynamicThreadState::default()
    };

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    assert_eq!(new.thread.title, "Weekly #10 (was #9)");
}

#[test]
fn broken_override_is_caught_before_rotation() {
    let (bot, _accounts) = setup();
    let mut item = thread_item();
    item.uid = "thread_manager.items.broken".to_string();
    item.redirect_template = Some("Moved to {{ thread_url".into());
    let config = manager(vec![("discussion", thread_item()), ("broken", item)]);

    let err = check_templates(&config).unwrap_err();
    assert!(matches!(err, ThreadError::Render { .. }));
    assert_eq!(err.uid(), "thread_manager.items.broken");
    assert!(bot.calls().is_empty());

    assert!(check_templates(&manager(vec![("discussion", thread_item())])).is_ok());
}

#[test]
fn approval_is_skipped_when_disabled() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.approve_new = false;
    let mut state = DynamicThreadState::default();

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    assert!(!bot.is_approved(&new.thread.id));
}

#[test]
fn source_without_markers_is_unavailable() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "discussion_thread", "no markers here", at(2024, 3, 2).timestamp());
    let item = thread_item();
    let mut state = DynamicThreadState::default();

    let err = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap_err();
    assert!(matches!(err, ThreadError::SourceUnavailable { .. }));
    assert_eq!(err.uid(), "thread_manager.items.discussion");
    assert!(!bot.calls().iter().any(|c| matches!(c, Call::Submit { .. })));
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

#[test]
fn same_month_syncs_and_next_month_rotates() {
    let (bot, accounts) = setup();
    let item = thread_item();
    let mut state = DynamicThreadState::default();
    let first = created(manage_thread_at(&item, &mut state, &accounts, at(2024, 3, 5), false).unwrap());

    bot.set_now(at(2024, 3, 10).timestamp());
    bot.put_wiki_page(
        SUB,
        "discussion_thread",
        "[](/# Thread Start)\nUpdated rules.\n[](/# Thread End)",
        at(2024, 3, 10).timestamp(),
    );
    match manage_thread_at(&item, &mut state, &accounts, at(2024, 3, 20), false).unwrap() {
        ThreadOutcome::Synced(SyncOutcome::Synced(targets)) => {
            assert_eq!(targets.len(), 1);
            assert_eq!(targets[0].key, "managed_thread");
            assert_eq!(targets[0].outcome, TargetOutcome::Written);
        }
        other => panic!("expected a sync, got {other:?}"),
    }
    assert!(bot
        .post(&first.thread.id)
        .unwrap()
        .selftext
        .contains("\n\nUpdated rules.\n\n"));
    assert_eq!(state.thread_number, 1);

    let second = created(manage_thread_at(&item, &mut state, &accounts, at(2024, 4, 1), false).unwrap());
    assert_eq!(second.previous_id.as_deref(), Some(first.thread.id.as_str()));
    assert_eq!(second.thread_number, 2);
    assert_eq!(state.thread_id.as_deref(), Some(second.thread.id.as_str()));
}

#[test]
fn disabled_interval_never_rotates() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.new_thread_interval = None;
    let (old, mut state) = with_previous(&bot);

    let outcome = manage_thread_at(&item, &mut state, &accounts, at(2030, 1, 1), false).unwrap();
    assert!(matches!(outcome, ThreadOutcome::Synced(_)));
    assert_eq!(state.thread_id.as_deref(), Some(old.id.as_str()));
}

#[test]
fn force_rotates_inside_the_interval() {
    let (bot, accounts) = setup();
    let item = thread_item();
    let (old, mut state) = with_previous(&bot);

    let new = created(manage_thread_at(&item, &mut state, &accounts, at(2024, 3, 5), true).unwrap());
    assert_eq!(new.previous_id.as_deref(), Some(old.id.as_str()));
    assert_eq!(new.thread_number, 5);
}

#[test]
fn sync_without_thread_id_is_an_error() {
    let (_bot, accounts) = setup();
    let mut item = thread_item();
    item.new_thread_interval = None;
    let mut state = DynamicThreadState::default();

    let err = sync_thread(&item, &mut state, &accounts).unwrap_err();
    assert!(matches!(err, ThreadError::MissingThreadId { .. }));
}

#[test]
fn disabled_item_does_nothing() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.enabled = false;
    let mut state = DynamicThreadState::default();

    let outcome = manage_thread_at(&item, &mut state, &accounts, at(2024, 3, 5), false).unwrap();
    assert_eq!(outcome, ThreadOutcome::Disabled);
    assert!(bot.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Pins
// ---------------------------------------------------------------------------

#[test]
fn top_mode_keeps_unrelated_pin_despite_slot_lag() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.pin_mode = PinMode::Top;
    let (old, mut state) = with_previous(&bot);
    let other = bot.add_selfpost(SUB, "Rules", "Be nice");
    bot.set_stickies(SUB, &[&old.id, &other.id]);
    bot.set_sticky_lag(true);

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    assert!(new.pinned);
    assert_eq!(bot.stickies(SUB), vec![new.thread.id.clone(), other.id.clone()]);
}

#[test]
fn top_mode_ignores_old_thread_in_bottom_slot() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.pin_mode = PinMode::Top;
    let (old, mut state) = with_previous(&bot);
    let other = bot.add_selfpost(SUB, "Rules", "Be nice");
    bot.set_stickies(SUB, &[&other.id, &old.id]);
    bot.set_sticky_lag(true);

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    assert_eq!(bot.stickies(SUB), vec![new.thread.id.clone(), other.id.clone()]);
}

#[test]
fn auto_mode_takes_over_old_slot() {
    let (bot, accounts) = setup();
    let item = thread_item();
    let (old, mut state) = with_previous(&bot);
    let other = bot.add_selfpost(SUB, "Rules", "Be nice");
    bot.set_stickies(SUB, &[&other.id, &old.id]);

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    assert!(new.pinned);
    assert_eq!(bot.stickies(SUB), vec![other.id.clone(), new.thread.id.clone()]);
}

#[test]
fn auto_mode_leaves_pins_alone_when_old_was_not_pinned() {
    let (bot, accounts) = setup();
    let item = thread_item();
    let (_old, mut state) = with_previous(&bot);
    let other = bot.add_selfpost(SUB, "Rules", "Be nice");
    bot.set_stickies(SUB, &[&other.id]);

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    assert!(!new.pinned);
    assert_eq!(bot.stickies(SUB), vec![other.id.clone()]);
}

#[test]
fn rejected_pin_is_approved_and_retried() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.approve_new = false;
    let (old, mut state) = with_previous(&bot);
    bot.set_stickies(SUB, &[&old.id]);
    bot.fail_once(Op::SetSticky, PlatformError::BadRequest("not approved".into()));

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    assert!(new.pinned);
    assert!(bot.is_approved(&new.thread.id));
    assert_eq!(bot.stickies(SUB), vec![new.thread.id.clone(), old.id.clone()]);
}

// ---------------------------------------------------------------------------
// Links and redirects
// ---------------------------------------------------------------------------

#[test]
fn link_pages_point_at_new_thread() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.link_update_pages = vec!["index".to_string(), "faq".to_string()];
    let (old, mut state) = with_previous(&bot);
    bot.put_wiki_page(
        SUB,
        "index",
        &format!(
            "Current: https://www.reddit.com{} or {}",
            old.permalink.to_uppercase(),
            old.shortlink
        ),
        1,
    );
    bot.put_wiki_page(SUB, "faq", "Nothing to see", 1);

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();

    assert_eq!(new.pages_updated, vec!["index".to_string()]);
    assert_eq!(
        bot.wiki_content(SUB, "index").unwrap(),
        format!(
            "Current: https://www.reddit.com{} or {}",
            new.thread.permalink, new.thread.shortlink
        )
    );
    assert_eq!(bot.wiki_content(SUB, "faq").unwrap(), "Nothing to see");
    assert!(bot.calls().contains(&Call::EditWiki {
        subreddit: SUB.to_string(),
        page: "index".to_string(),
        reason: "Update Discussion thread URLs".to_string(),
    }));
}

#[test]
fn old_thread_gets_redirect_notice_and_sticky_comment() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.redirect_op = true;
    item.redirect_sticky = true;
    let (old, mut state) = with_previous(&bot);

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();

    let notice = format!(
        "This thread is no longer being updated, and has been replaced by:\n\n# [{}]({})",
        new.thread.title, new.thread.url
    );
    assert_eq!(
        bot.post(&old.id).unwrap().selftext,
        format!("{notice}\n\nOld body")
    );
    assert_eq!(bot.replies(&old.id), vec![("bot".to_string(), notice, true)]);
}

#[test]
fn custom_redirect_template() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.redirect_sticky = true;
    item.redirect_template = Some("Moved to {{ thread_shortlink }}".to_string());
    let (old, mut state) = with_previous(&bot);

    let new = create_new_thread(&item, &mut state, &accounts, at(2024, 3, 5)).unwrap();
    let replies = bot.replies(&old.id);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].1, format!("Moved to {}", new.thread.shortlink));
    assert_eq!(bot.post(&old.id).unwrap().selftext, "Old body");
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

fn manager(items: Vec<(&str, ThreadItem)>) -> ThreadManagerConfig {
    let items: IndexMap<String, ThreadItem> =
        items.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    ThreadManagerConfig {
        enabled: true,
        items,
    }
}

#[test]
fn failed_item_leaves_its_record_untouched() {
    let (bot, accounts) = setup();
    let config = manager(vec![("discussion", thread_item())]);
    let mut state = DynamicThreadManager::default();
    bot.fail_on(Op::Submit, PlatformError::Connection("timeout".into()));

    let results = manage_threads_at(&config, &mut state, &accounts, at(2024, 3, 5), &[]);
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].result, Err(ThreadError::Platform { .. })));
    assert!(state.items.is_empty());

    bot.clear_failures();
    let results = manage_threads_at(&config, &mut state, &accounts, at(2024, 3, 5), &[]);
    assert!(matches!(results[0].result, Ok(ThreadOutcome::Created(_))));
    assert_eq!(state.items["discussion"].thread_number, 1);
}

#[test]
fn rotation_failing_after_post_keeps_the_new_thread() {
    let (bot, accounts) = setup();
    let mut item = thread_item();
    item.link_update_pages = vec!["missing_page".to_string()];
    let config = manager(vec![("discussion", item)]);
    let (old, record) = with_previous(&bot);
    let mut state = DynamicThreadManager::default();
    state.items.insert("discussion".to_string(), record);
    bot.set_now(at(2024, 4, 5).timestamp());

    let results = manage_threads_at(&config, &mut state, &accounts, at(2024, 4, 5), &[]);
    let err = results[0].result.as_ref().unwrap_err();
    assert!(matches!(err, ThreadError::RotationIncomplete { .. }));
    let posted = err.posted_thread().unwrap().to_string();
    assert_eq!(state.items["discussion"].thread_id.as_deref(), Some(posted.as_str()));
    assert_eq!(state.items["discussion"].thread_number, 5);
    assert_ne!(posted, old.id);

    for day in [6, 7] {
        let results = manage_threads_at(&config, &mut state, &accounts, at(2024, 4, day), &[]);
        assert!(matches!(results[0].result, Ok(ThreadOutcome::Synced(_))));
    }
    let submits = bot
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::Submit { .. }))
        .count();
    assert_eq!(submits, 1);
    assert_eq!(state.items["discussion"].thread_id.as_deref(), Some(posted.as_str()));
    assert_eq!(state.items["discussion"].thread_number, 5);
}

#[test]
fn one_failure_does_not_stop_siblings() {
    let (bot, accounts) = setup();
    let mut broken = thread_item();
    broken.uid = "thread_manager.items.broken".to_string();
    broken.source.endpoint.endpoint_name = "missing_page".to_string();
    let config = manager(vec![("broken", broken), ("discussion", thread_item())]);
    let mut state = DynamicThreadManager::default();

    let results = manage_threads_at(&config, &mut state, &accounts, at(2024, 3, 5), &[]);
    assert!(results[0].result.is_err());
    assert_eq!(results[0].uid, "thread_manager.items.broken");
    assert!(results[1].result.is_ok());
    assert!(!state.items.contains_key("broken"));
    assert!(bot.post(state.items["discussion"].thread_id.as_deref().unwrap()).is_some());
}

#[test]
fn forced_keys_rotate_only_named_items() {
    let (bot, accounts) = setup();
    let config = manager(vec![("discussion", thread_item())]);
    let (old, record) = with_previous(&bot);
    let mut state = DynamicThreadManager::default();
    state.items.insert("discussion".to_string(), record);

    let results = manage_threads_at(&config, &mut state, &accounts, at(2024, 3, 5), &[]);
    assert!(matches!(results[0].result, Ok(ThreadOutcome::Synced(_))));
    assert_eq!(state.items["discussion"].thread_id.as_deref(), Some(old.id.as_str()));

    let forced = vec!["discussion".to_string()];
    let results = manage_threads_at(&config, &mut state, &accounts, at(2024, 3, 5), &forced);
    assert!(matches!(results[0].result, Ok(ThreadOutcome::Created(_))));
    assert_ne!(state.items["discussion"].thread_id.as_deref(), Some(old.id.as_str()));
}

#[test]
fn disabled_manager_returns_nothing() {
    let (bot, accounts) = setup();
    let mut config = manager(vec![("discussion", thread_item())]);
    config.enabled = false;
    let mut state = DynamicThreadManager::default();

    assert!(manage_threads_at(&config, &mut state, &accounts, at(2024, 3, 5), &[]).is_empty());
    assert!(bot.calls().is_empty());
}
