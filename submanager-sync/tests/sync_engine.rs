use std::sync::Arc;

use submanager_core::memory::{Call, MemoryPlatform, Op};
use submanager_core::platform::{TopbarWidget, WidgetKind};
use submanager_core::state::DynamicSyncManager;
use submanager_core::{
    Accounts, ContextConfig, DynamicSyncState, EndpointConfig, EndpointType, FullEndpointConfig,
    MenuLink, MenuSection, PatternConfig, PlatformError, SyncItem, SyncManagerConfig,
};
use submanager_sync::{
    preview_one, process_source, sync_all, sync_one, Content, Endpoint, PreviewChange, SyncError,
    SyncOutcome, TargetOutcome,
};

const SUB: &str = "testsub";

fn setup() -> (MemoryPlatform, Accounts) {
    let bot = MemoryPlatform::new("bot");
    bot.add_subreddit(SUB, &["bot"]);
    let accounts = Accounts::new().with("bot", Arc::new(bot.clone()));
    (bot, accounts)
}

fn endpoint(uid: &str, name: &str, endpoint_type: EndpointType) -> FullEndpointConfig {
    let context = ContextConfig {
        account: "bot".to_string(),
        subreddit: SUB.to_string(),
    };
    FullEndpointConfig::new(EndpointConfig::new(uid, context, name, endpoint_type))
}

fn wiki(uid: &str, page: &str, pattern: Option<&str>) -> FullEndpointConfig {
    let mut cfg = endpoint(uid, page, EndpointType::WikiPage);
    if let Some(p) = pattern {
        cfg.pattern = PatternConfig::with_pattern(p);
    }
    cfg
}

fn item(source: FullEndpointConfig, targets: Vec<(&str, FullEndpointConfig)>) -> SyncItem {
    SyncItem {
        uid: "sync_manager.items.test".to_string(),
        description: Some("Test item".to_string()),
        enabled: true,
        source,
        targets: targets
            .into_iter()
            .map(|(key, cfg)| (key.to_string(), cfg))
            .collect(),
    }
}

fn outcomes(outcome: &SyncOutcome) -> Vec<TargetOutcome> {
    match outcome {
        SyncOutcome::Synced(targets) => targets.iter().map(|t| t.outcome).collect(),
        other => panic!("expected Synced, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// process_source
// ---------------------------------------------------------------------------

#[test]
fn unchanged_revision_returns_none_and_keeps_timestamp() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "[](/# S Start)body[](/# S End)", 100);
    let cfg = wiki("src_uid", "src", Some("S"));
    let source = Endpoint::resolve(&cfg.endpoint, &accounts).unwrap();
    let mut state = DynamicSyncState::default();

    let first = process_source(&cfg, &source, &mut state).unwrap();
    assert_eq!(first, Some(Content::Text("body".to_string())));
    assert_eq!(state.source_timestamp, 100);

    let second = process_source(&cfg, &source, &mut state).unwrap();
    assert_eq!(second, None);
    assert_eq!(state.source_timestamp, 100);
}

#[test]
fn missing_source_markers_skip_but_record_revision() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "no markers here", 50);
    let cfg = wiki("src_uid", "src", Some("S"));
    let source = Endpoint::resolve(&cfg.endpoint, &accounts).unwrap();
    let mut state = DynamicSyncState::default();

    assert_eq!(process_source(&cfg, &source, &mut state).unwrap(), None);
    assert_eq!(state.source_timestamp, 50);
}

#[test]
fn source_replacements_then_truncation() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "one cat\ntwo cat\nthree cat", 10);
    let mut cfg = wiki("src_uid", "src", None);
    cfg.replace_patterns.insert("cat".to_string(), "dog".to_string());
    cfg.truncate_lines = Some(2);
    let source = Endpoint::resolve(&cfg.endpoint, &accounts).unwrap();

    let content = process_source(&cfg, &source, &mut DynamicSyncState::default()).unwrap();
    assert_eq!(content, Some(Content::Text("one dog\ntwo dog".to_string())));
}

#[test]
fn never_edited_thread_reports_creation_time() {
    let (bot, accounts) = setup();
    bot.set_now(1_000);
    let post = bot.add_selfpost(SUB, "Thread", "text");
    let cfg = endpoint("thread_uid", &post.id, EndpointType::Thread);
    let thread = Endpoint::resolve(&cfg.endpoint, &accounts).unwrap();
    assert_eq!(thread.revision_date().unwrap(), Some(1_000));

    bot.set_edited(&post.id, Some(2_000));
    assert_eq!(thread.revision_date().unwrap(), Some(2_000));
}

// ---------------------------------------------------------------------------
// sync_one
// ---------------------------------------------------------------------------

#[test]
fn marker_scenario_updates_only_the_region() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "A\n\n[](/# S Start)old[](/# S End)\n\nB", 100);
    bot.put_wiki_page(SUB, "dst", "[](/# S Start)stale[](/# S End)", 1);
    let item = item(wiki("src_uid", "src", Some("S")), vec![("dst", wiki("dst_uid", "dst", Some("S")))]);
    let mut state = DynamicSyncState::default();

    let outcome = sync_one(&item, &mut state, &accounts).unwrap();
    assert_eq!(outcomes(&outcome), vec![TargetOutcome::Written]);
    assert_eq!(bot.wiki_content(SUB, "dst").unwrap(), "[](/# S Start)old[](/# S End)");
    assert_eq!(state.source_timestamp, 100);
    assert!(bot.calls().contains(&Call::EditWiki {
        subreddit: SUB.to_string(),
        page: "dst".to_string(),
        reason: "Auto-sync Test item from src".to_string(),
    }));
}

#[test]
fn second_cycle_with_same_revision_writes_nothing() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "fresh", 100);
    bot.put_wiki_page(SUB, "dst", "stale", 1);
    let item = item(wiki("src_uid", "src", None), vec![("dst", wiki("dst_uid", "dst", None))]);
    let mut state = DynamicSyncState::default();

    sync_one(&item, &mut state, &accounts).unwrap();
    let calls_after_first = bot.calls().len();
    let outcome = sync_one(&item, &mut state, &accounts).unwrap();
    assert_eq!(outcome, SyncOutcome::SourceSkipped);
    assert_eq!(bot.calls().len(), calls_after_first);
}

#[test]
fn target_missing_markers_does_not_block_siblings() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "[](/# S Start)new[](/# S End)", 100);
    bot.put_wiki_page(SUB, "plain", "no markers", 1);
    bot.put_wiki_page(SUB, "marked", "x [](/# S Start)\n\nold\n\n[](/# S End) y", 1);
    let item = item(
        wiki("src_uid", "src", Some("S")),
        vec![
            ("plain", wiki("plain_uid", "plain", Some("S"))),
            ("marked", wiki("marked_uid", "marked", Some("S"))),
        ],
    );

    let outcome = sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap();
    assert_eq!(
        outcomes(&outcome),
        vec![TargetOutcome::PatternNotFound, TargetOutcome::Written]
    );
    assert_eq!(bot.wiki_content(SUB, "plain").unwrap(), "no markers");
    assert_eq!(
        bot.wiki_content(SUB, "marked").unwrap(),
        "x [](/# S Start)\n\nnew\n\n[](/# S End) y"
    );
}

#[test]
fn identical_target_is_not_rewritten() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "same", 100);
    bot.put_wiki_page(SUB, "dst", "same", 1);
    let item = item(wiki("src_uid", "src", None), vec![("dst", wiki("dst_uid", "dst", None))]);

    let outcome = sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap();
    assert_eq!(outcomes(&outcome), vec![TargetOutcome::Unchanged]);
    assert!(bot.calls().is_empty());
}

#[test]
fn target_replacements_apply_after_source() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "see /r/old", 100);
    bot.put_wiki_page(SUB, "dst", "", 1);
    let mut target = wiki("dst_uid", "dst", None);
    target.replace_patterns.insert("/r/old".to_string(), "/r/new".to_string());
    let item = item(wiki("src_uid", "src", None), vec![("dst", target)]);

    sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap();
    assert_eq!(bot.wiki_content(SUB, "dst").unwrap(), "see /r/new");
}

#[test]
fn disabled_item_source_and_target() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "v", 100);
    bot.put_wiki_page(SUB, "dst", "", 1);

    let mut disabled = item(wiki("src_uid", "src", None), vec![("dst", wiki("dst_uid", "dst", None))]);
    disabled.enabled = false;
    assert_eq!(
        sync_one(&disabled, &mut DynamicSyncState::default(), &accounts).unwrap(),
        SyncOutcome::Disabled
    );

    let mut source_off = disabled.clone();
    source_off.enabled = true;
    source_off.source.enabled = false;
    assert_eq!(
        sync_one(&source_off, &mut DynamicSyncState::default(), &accounts).unwrap(),
        SyncOutcome::Disabled
    );

    let mut target_off = source_off.clone();
    target_off.source.enabled = true;
    target_off.targets["dst"].enabled = false;
    let outcome = sync_one(&target_off, &mut DynamicSyncState::default(), &accounts).unwrap();
    assert_eq!(outcomes(&outcome), vec![TargetOutcome::Disabled]);
    assert!(bot.calls().is_empty());
}

#[test]
fn no_targets_fails_before_resolution() {
    let (bot, accounts) = setup();
    bot.fail_on(Op::Subreddit, PlatformError::Connection("offline".to_string()));
    let item = item(wiki("src_uid", "src", None), vec![]);

    let err = sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap_err();
    assert!(matches!(err, SyncError::NoTargets { .. }), "got {err:?}");
    assert_eq!(err.uid(), "sync_manager.items.test");
}

#[test]
fn widget_target_without_markers_is_replaced_whole() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "rules", "1. Be nice", 100);
    bot.add_sidebar_widget(
        SUB,
        "w1",
        "Rules",
        WidgetKind::TextArea {
            text: "old rules".to_string(),
        },
    );
    let item = item(
        wiki("src_uid", "rules", None),
        vec![("widget", endpoint("widget_uid", "Rules", EndpointType::Widget))],
    );

    sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap();
    assert_eq!(bot.text_widget(SUB, "Rules").unwrap(), "1. Be nice");
}

#[test]
fn menu_target_receives_parsed_markdown() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(
        SUB,
        "navigation",
        "[Home](https://example.com)\n\n[Wiki](https://example.com/wiki)\n[Rules](https://example.com/rules)",
        100,
    );
    bot.add_topbar_widget(
        SUB,
        TopbarWidget::Menu {
            id: "menu1".to_string(),
            data: Vec::new(),
        },
    );
    let item = item(
        wiki("src_uid", "navigation", None),
        vec![("menu", endpoint("menu_uid", "menu", EndpointType::Menu))],
    );

    sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap();
    assert_eq!(
        bot.menu(SUB).unwrap(),
        vec![
            MenuSection::Link(MenuLink {
                text: "Home".to_string(),
                url: "https://example.com".to_string(),
            }),
            MenuSection::Submenu {
                text: "Wiki".to_string(),
                children: vec![MenuLink {
                    text: "Rules".to_string(),
                    url: "https://example.com/rules".to_string(),
                }],
            },
        ]
    );
}

#[test]
fn menu_source_replicates_to_menu_target_and_skips_text_target() {
    let (bot, accounts) = setup();
    let data = vec![MenuSection::Link(MenuLink {
        text: "Home".to_string(),
        url: "https://example.com".to_string(),
    })];
    bot.add_topbar_widget(
        SUB,
        TopbarWidget::Menu {
            id: "menu1".to_string(),
            data: data.clone(),
        },
    );
    bot.put_wiki_page(SUB, "dst", "untouched", 1);
    let item = item(
        endpoint("menu_uid", "menu", EndpointType::Menu),
        vec![
            ("menu", endpoint("menu_target_uid", "menu", EndpointType::Menu)),
            ("wiki", wiki("dst_uid", "dst", None)),
        ],
    );

    let outcome = sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap();
    assert_eq!(
        outcomes(&outcome),
        vec![TargetOutcome::Unchanged, TargetOutcome::Unchanged]
    );
    assert_eq!(bot.menu(SUB).unwrap(), data);
    assert_eq!(bot.wiki_content(SUB, "dst").unwrap(), "untouched");
}

#[test]
fn failing_write_propagates_with_target_uid() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "v", 100);
    bot.put_wiki_page(SUB, "dst", "", 1);
    bot.fail_on(Op::EditWiki, PlatformError::Connection("reset".to_string()));
    let item = item(wiki("src_uid", "src", None), vec![("dst", wiki("dst_uid", "dst", None))]);

    let err = sync_one(&item, &mut DynamicSyncState::default(), &accounts).unwrap_err();
    assert!(matches!(err, SyncError::Platform { .. }));
    assert_eq!(err.uid(), "dst_uid");
}

// ---------------------------------------------------------------------------
// sync_all
// ---------------------------------------------------------------------------

#[test]
fn failing_item_leaves_its_state_and_others_still_run() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "good_src", "fresh", 300);
    bot.put_wiki_page(SUB, "good_dst", "", 1);

    let mut broken = item(wiki("broken_src", "missing", None), vec![("dst", wiki("b_dst", "good_dst", None))]);
    broken.uid = "sync_manager.items.broken".to_string();
    let mut good = item(wiki("good_src", "good_src", None), vec![("dst", wiki("g_dst", "good_dst", None))]);
    good.uid = "sync_manager.items.good".to_string();

    let mut config = SyncManagerConfig::default();
    config.items.insert("broken".to_string(), broken);
    config.items.insert("good".to_string(), good);

    let mut state = DynamicSyncManager::default();
    state
        .items
        .insert("broken".to_string(), DynamicSyncState { source_timestamp: 7 });

    let results = sync_all(&config, &mut state, &accounts);
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0].result, Err(SyncError::ObjectNotFound { .. })));
    assert!(results[1].result.is_ok());
    assert_eq!(state.items["broken"].source_timestamp, 7);
    assert_eq!(state.items["good"].source_timestamp, 300);
    assert_eq!(bot.wiki_content(SUB, "good_dst").unwrap(), "fresh");
}

#[test]
fn disabled_manager_does_nothing() {
    let (_bot, accounts) = setup();
    let mut config = SyncManagerConfig::default();
    config.enabled = false;
    config
        .items
        .insert("x".to_string(), item(wiki("s", "s", None), vec![]));
    assert!(sync_all(&config, &mut DynamicSyncManager::default(), &accounts).is_empty());
}

// ---------------------------------------------------------------------------
// preview_one
// ---------------------------------------------------------------------------

#[test]
fn preview_reports_diff_without_writing() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "[](/# S Start)new line[](/# S End)", 100);
    bot.put_wiki_page(SUB, "dst", "header\n[](/# S Start)\nold line\n[](/# S End)\nfooter\n", 1);
    let item = item(wiki("src_uid", "src", Some("S")), vec![("dst", wiki("dst_uid", "dst", Some("S")))]);
    let state = DynamicSyncState::default();

    let previews = preview_one(&item, &state, &accounts).unwrap();
    assert_eq!(previews.len(), 1);
    let PreviewChange::Text { unified_diff } = &previews[0].change else {
        panic!("expected text diff, got {:?}", previews[0].change);
    };
    assert!(unified_diff.contains("--- a/dst_uid"));
    assert!(unified_diff.contains("-old line"));
    assert!(unified_diff.contains("+new line"));
    assert!(bot.calls().is_empty());
    assert_eq!(state.source_timestamp, 0);
}

#[test]
fn preview_of_unchanged_source_is_empty() {
    let (bot, accounts) = setup();
    bot.put_wiki_page(SUB, "src", "v", 100);
    bot.put_wiki_page(SUB, "dst", "", 1);
    let item = item(wiki("src_uid", "src", None), vec![("dst", wiki("dst_uid", "dst", None))]);
    let state = DynamicSyncState { source_timestamp: 100 };
    assert!(preview_one(&item, &state, &accounts).unwrap().is_empty());
}
