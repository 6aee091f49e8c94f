//! Creating a new thread and retiring the old one.

use chrono::{DateTime, Utc};
use regex::{NoExpand, RegexBuilder};

use submanager_core::platform::Submission;
use submanager_core::{
    Accounts, DynamicThreadState, EndpointConfig, EndpointType, PatternConfig, Platform, ThreadItem,
    ThreadManagerConfig,
};
use submanager_renderer::{ThreadTemplateContext, ThreadTemplates};
use submanager_sync::{marker_token, process_source, Content, Endpoint};

use crate::error::{platform_err, ThreadError};
use crate::pins::pin_new_thread;

/// Marker pattern delimiting the synced region of a managed thread.
pub const THREAD_PATTERN: &str = "Auto Sync";

/// Marker config for the body of a thread managed by `item`.
pub fn thread_pattern(item: &ThreadItem) -> PatternConfig {
    PatternConfig {
        pattern: Some(THREAD_PATTERN.to_string()),
        pattern_start: item.source.pattern.pattern_start.clone(),
        pattern_end: item.source.pattern.pattern_end.clone(),
    }
}

/// `text` framed by the thread markers, blank line on each side.
pub fn thread_body(item: &ThreadItem, text: &str) -> String {
    let pattern = thread_pattern(item);
    format!(
        "{}\n\n{}\n\n{}",
        marker_token(&format!("{THREAD_PATTERN}{}", pattern.pattern_start)),
        text.trim(),
        marker_token(&format!("{THREAD_PATTERN}{}", pattern.pattern_end)),
    )
}

/// What a rotation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub thread: Submission,
    pub previous_id: Option<String>,
    pub thread_number: u64,
    pub pinned: bool,
    /// Wiki pages whose links were rewritten.
    pub pages_updated: Vec<String>,
}

pub(crate) fn platform_for<'a>(
    accounts: &'a Accounts,
    account: &str,
    uid: &str,
) -> Result<&'a dyn Platform, ThreadError> {
    accounts.get(account).ok_or_else(|| ThreadError::MissingAccount {
        uid: uid.to_string(),
        account: account.to_string(),
    })
}

/// Compile every item's title and redirect overrides.
pub fn check_templates(config: &ThreadManagerConfig) -> Result<(), ThreadError> {
    for item in config.items.values() {
        ThreadTemplates::new(
            item.post_title_template.as_deref(),
            item.redirect_template.as_deref(),
        )
        .map_err(|source| ThreadError::Render {
            uid: item.uid.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Post the next thread of `item` and retire the current one.
///
/// Bumps `thread_number`, resets the source timestamp, posts the thread from
/// the target context, approves it, migrates the pin, rewrites links on the
/// configured wiki pages and leaves redirect notices on the old thread.
///
/// `state.thread_id` points at the new thread as soon as it is posted. If a
/// later step fails the error is [`ThreadError::RotationIncomplete`] and
/// `state` still describes the new thread, so it must be kept.
pub fn create_new_thread(
    item: &ThreadItem,
    state: &mut DynamicThreadState,
    accounts: &Accounts,
    now: DateTime<Utc>,
) -> Result<NewThread, ThreadError> {
    let uid = item.uid.as_str();
    state.sync.source_timestamp = 0;
    state.thread_number += 1;
    let previous_id = state.thread_id.clone();

    let render_err = |source| ThreadError::Render {
        uid: uid.to_string(),
        source,
    };
    let templates = ThreadTemplates::new(
        item.post_title_template.as_deref(),
        item.redirect_template.as_deref(),
    )
    .map_err(render_err)?;
    let mut vars = ThreadTemplateContext::new(
        now,
        item.context.subreddit.as_str(),
        state.thread_number,
        previous_id.as_deref(),
    );
    vars.post_title = templates.render_title(&vars).map_err(render_err)?;

    let source = Endpoint::resolve(&item.source.endpoint, accounts)?;
    let text = match process_source(&item.source, &source, &mut state.sync)? {
        Some(Content::Text(text)) => text,
        _ => {
            return Err(ThreadError::SourceUnavailable {
                uid: uid.to_string(),
            })
        }
    };

    let poster = platform_for(accounts, &item.target_context.account, uid)?;
    let moderator = platform_for(accounts, &item.context.account, uid)?;

    let thread = poster
        .submit_selfpost(
            &item.target_context.subreddit,
            &vars.post_title,
            &thread_body(item, &text),
        )
        .map_err(platform_err(uid))?;
    tracing::info!("{uid}: posted thread #{} as {}", state.thread_number, thread.id);
    state.thread_id = Some(thread.id.clone());
    vars.set_thread(&thread);

    let (pinned, pages_updated) = retire_previous(
        item,
        accounts,
        poster,
        moderator,
        previous_id.as_deref(),
        &thread,
        &templates,
        &vars,
    )
    .map_err(|source| ThreadError::RotationIncomplete {
        uid: uid.to_string(),
        thread_id: thread.id.clone(),
        source: Box::new(source),
    })?;

    Ok(NewThread {
        thread,
        previous_id,
        thread_number: state.thread_number,
        pinned,
        pages_updated,
    })
}

/// Everything after the post: approve, pin, rewrite links, redirect.
#[allow(clippy::too_many_arguments)]
fn retire_previous(
    item: &ThreadItem,
    accounts: &Accounts,
    poster: &dyn Platform,
    moderator: &dyn Platform,
    previous_id: Option<&str>,
    thread: &Submission,
    templates: &ThreadTemplates,
    vars: &ThreadTemplateContext,
) -> Result<(bool, Vec<String>), ThreadError> {
    let uid = item.uid.as_str();
    poster
        .set_inbox_replies(&thread.id, false)
        .map_err(platform_err(uid))?;

    if item.approve_new {
        moderator.approve(&thread.id).map_err(platform_err(uid))?;
    }

    let old = match previous_id {
        Some(id) => Some(moderator.submission(id).map_err(platform_err(uid))?),
        None => None,
    };

    let pinned = pin_new_thread(moderator, item, old.as_ref(), thread)?;

    let mut pages_updated = Vec::new();
    if let Some(old) = &old {
        pages_updated = update_page_links(item, accounts, old, thread)?;
        add_redirect_messages(item, poster, moderator, old, templates, vars)?;
    }
    Ok((pinned, pages_updated))
}

/// Point every link to `old` on the item's link pages at `new`.
///
/// Both permalink and shortlink forms are replaced, case-insensitively and
/// literally. Pages whose text does not change are not edited.
pub fn update_page_links(
    item: &ThreadItem,
    accounts: &Accounts,
    old: &Submission,
    new: &Submission,
) -> Result<Vec<String>, ThreadError> {
    let uid = item.uid.as_str();
    let mut replacements = Vec::with_capacity(2);
    for (from, to) in [
        (&old.permalink, &new.permalink),
        (&old.shortlink, &new.shortlink),
    ] {
        let from = from.trim_matches('/');
        if from.is_empty() {
            continue;
        }
        let pattern = RegexBuilder::new(&regex::escape(from))
            .case_insensitive(true)
            .build()
            .map_err(|source| ThreadError::LinkPattern {
                uid: uid.to_string(),
                source,
            })?;
        replacements.push((pattern, to.trim_matches('/').to_string()));
    }

    let reason = format!("Update {} thread URLs", item.label());
    let mut updated = Vec::new();
    for page in &item.link_update_pages {
        let config = EndpointConfig::new(
            format!("{uid}.link_update_pages.{page}"),
            item.context.clone(),
            page.as_str(),
            EndpointType::WikiPage,
        );
        let endpoint = Endpoint::resolve(&config, accounts)?;
        let Content::Text(current) = endpoint.content()? else {
            continue;
        };
        let rewritten = replacements
            .iter()
            .fold(current.clone(), |text, (pattern, to)| {
                pattern.replace_all(&text, NoExpand(to)).into_owned()
            });
        if rewritten != current {
            endpoint.edit(&Content::Text(rewritten), &reason)?;
            tracing::info!("{uid}: updated thread links on wiki page {page}");
            updated.push(page.clone());
        }
    }
    Ok(updated)
}

/// Prepend the redirect notice to the old thread and/or reply with it as a
/// stickied, distinguished comment.
fn add_redirect_messages(
    item: &ThreadItem,
    poster: &dyn Platform,
    moderator: &dyn Platform,
    old: &Submission,
    templates: &ThreadTemplates,
    vars: &ThreadTemplateContext,
) -> Result<(), ThreadError> {
    if !(item.redirect_op || item.redirect_sticky) {
        return Ok(());
    }
    let uid = item.uid.as_str();
    let message = templates
        .render_redirect(vars)
        .map_err(|source| ThreadError::Render {
            uid: uid.to_string(),
            source,
        })?;

    if item.redirect_op {
        let current = poster.submission(&old.id).map_err(platform_err(uid))?;
        poster
            .edit_submission(&old.id, &format!("{message}\n\n{}", current.selftext))
            .map_err(platform_err(uid))?;
    }
    if item.redirect_sticky {
        let comment = moderator.reply(&old.id, &message).map_err(platform_err(uid))?;
        moderator
            .distinguish_comment(&comment.id, true)
            .map_err(platform_err(uid))?;
    }
    Ok(())
}
