//! In-memory [`Platform`] used by the test suites of every crate.
//!
//! Several [`MemoryPlatform`] handles can share one [`Site`], each acting as a
//! different user (see [`MemoryPlatform::as_user`]). Moderator-only calls
//! return `Forbidden` for users not listed as moderators of the subreddit,
//! and editing someone else's post returns `Forbidden` as well.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::platform::{
    Comment, Platform, PlatformError, SidebarWidget, Submission, Subreddit, TopbarWidget,
    WidgetKind, WikiPage,
};
use crate::types::MenuData;

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Subreddit,
    WikiPage,
    EditWiki,
    Submission,
    EditSubmission,
    Submit,
    SetInboxReplies,
    Approve,
    SetSticky,
    Sticky,
    Reply,
    Distinguish,
    SidebarWidgets,
    UpdateTextWidget,
    TopbarWidgets,
    UpdateMenu,
}

/// A mutating call, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EditWiki { subreddit: String, page: String, reason: String },
    EditSubmission { id: String },
    Submit { subreddit: String, title: String },
    SetInboxReplies { id: String, enabled: bool },
    Approve { id: String },
    SetSticky { id: String, state: bool, bottom: bool },
    Reply { parent: String, comment: String },
    Distinguish { comment: String, sticky: bool },
    UpdateTextWidget { widget: String },
    UpdateMenu { widget: String },
}

#[derive(Debug, Clone)]
struct Failure {
    error: PlatformError,
    once: bool,
}

#[derive(Debug, Clone)]
struct CommentRecord {
    parent: String,
    comment: Comment,
    author: String,
    distinguished_sticky: bool,
}

/// Shared world state behind every handle.
#[derive(Debug, Default)]
pub struct Site {
    now: i64,
    next_id: u64,
    subreddits: HashMap<String, HashSet<String>>,
    private: HashSet<String>,
    wiki: HashMap<(String, String), WikiPage>,
    submissions: HashMap<String, Submission>,
    approved: HashSet<String>,
    needs_approval_to_sticky: HashSet<String>,
    inbox_replies: HashMap<String, bool>,
    stickies: HashMap<String, Vec<String>>,
    sticky_lag: bool,
    pending_unsticky: Vec<String>,
    comments: Vec<CommentRecord>,
    sidebar: HashMap<String, Vec<SidebarWidget>>,
    topbar: HashMap<String, Vec<TopbarWidget>>,
    failures: HashMap<Op, Failure>,
    calls: Vec<Call>,
}

/// One user's view of a shared in-memory [`Site`].
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    username: String,
    site: Arc<Mutex<Site>>,
}

impl MemoryPlatform {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            site: Arc::new(Mutex::new(Site {
                now: 1_700_000_000,
                next_id: 1000,
                ..Site::default()
            })),
        }
    }

    /// Another user acting on the same site.
    pub fn as_user(&self, username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            site: Arc::clone(&self.site),
        }
    }

    fn site(&self) -> MutexGuard<'_, Site> {
        self.site.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---------------------------------------------------------------------
    // Setup
    // ---------------------------------------------------------------------

    pub fn set_now(&self, now: i64) {
        self.site().now = now;
    }

    pub fn add_subreddit(&self, name: &str, moderators: &[&str]) {
        self.site().subreddits.insert(
            name.to_lowercase(),
            moderators.iter().map(|m| m.to_string()).collect(),
        );
    }

    /// Readable by nobody; `subreddit()` returns `Forbidden`.
    pub fn make_private(&self, name: &str) {
        self.site().private.insert(name.to_lowercase());
    }

    pub fn put_wiki_page(&self, subreddit: &str, page: &str, content: &str, revision_date: i64) {
        self.site().wiki.insert(
            (subreddit.to_lowercase(), page.to_string()),
            WikiPage {
                name: page.to_string(),
                content_md: content.to_string(),
                revision_date,
            },
        );
    }

    /// Insert a self post authored by this handle's user.
    pub fn add_selfpost(&self, subreddit: &str, title: &str, selftext: &str) -> Submission {
        let mut site = self.site();
        let id = site.allocate_id();
        let created = site.now;
        let post = new_submission(&id, subreddit, title, &self.username, selftext, created);
        site.submissions.insert(id, post.clone());
        post
    }

    pub fn add_linkpost(&self, subreddit: &str, title: &str) -> Submission {
        let mut post = self.add_selfpost(subreddit, title, "");
        post.is_self = false;
        self.site().submissions.insert(post.id.clone(), post.clone());
        post
    }

    pub fn set_edited(&self, id: &str, edited: Option<i64>) {
        if let Some(post) = self.site().submissions.get_mut(id) {
            post.edited = edited;
        }
    }

    pub fn add_sidebar_widget(&self, subreddit: &str, id: &str, short_name: &str, kind: WidgetKind) {
        self.site()
            .sidebar
            .entry(subreddit.to_lowercase())
            .or_default()
            .push(SidebarWidget {
                id: id.to_string(),
                short_name: short_name.to_string(),
                kind,
            });
    }

    pub fn add_topbar_widget(&self, subreddit: &str, widget: TopbarWidget) {
        self.site()
            .topbar
            .entry(subreddit.to_lowercase())
            .or_default()
            .push(widget);
    }

    /// Replace the sticky slots of `subreddit`, top first.
    pub fn set_stickies(&self, subreddit: &str, ids: &[&str]) {
        self.site().stickies.insert(
            subreddit.to_lowercase(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    /// Keep unstickied posts visible in their slot until the next sticky.
    pub fn set_sticky_lag(&self, lag: bool) {
        self.site().sticky_lag = lag;
    }

    /// The first sticky of `id` is rejected with `BadRequest` until approved.
    pub fn require_approval_to_sticky(&self, id: &str) {
        self.site().needs_approval_to_sticky.insert(id.to_string());
    }

    pub fn fail_on(&self, op: Op, error: PlatformError) {
        self.site().failures.insert(op, Failure { error, once: false });
    }

    pub fn fail_once(&self, op: Op, error: PlatformError) {
        self.site().failures.insert(op, Failure { error, once: true });
    }

    pub fn clear_failures(&self) {
        self.site().failures.clear();
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    pub fn calls(&self) -> Vec<Call> {
        self.site().calls.clone()
    }

    pub fn wiki_content(&self, subreddit: &str, page: &str) -> Option<String> {
        self.site()
            .wiki
            .get(&(subreddit.to_lowercase(), page.to_string()))
            .map(|p| p.content_md.clone())
    }

    pub fn post(&self, id: &str) -> Option<Submission> {
        self.site().submissions.get(id).cloned()
    }

    pub fn stickies(&self, subreddit: &str) -> Vec<String> {
        let site = self.site();
        site.stickies
            .get(&subreddit.to_lowercase())
            .map(|ids| {
                ids.iter()
                    .filter(|id| !site.pending_unsticky.contains(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_approved(&self, id: &str) -> bool {
        self.site().approved.contains(id)
    }

    pub fn inbox_replies(&self, id: &str) -> Option<bool> {
        self.site().inbox_replies.get(id).copied()
    }

    /// `(author, body, distinguished as sticky)` for replies to `parent`.
    pub fn replies(&self, parent: &str) -> Vec<(String, String, bool)> {
        self.site()
            .comments
            .iter()
            .filter(|c| c.parent == parent)
            .map(|c| (c.author.clone(), c.comment.body.clone(), c.distinguished_sticky))
            .collect()
    }

    pub fn text_widget(&self, subreddit: &str, short_name: &str) -> Option<String> {
        self.site()
            .sidebar
            .get(&subreddit.to_lowercase())?
            .iter()
            .find_map(|w| match &w.kind {
                WidgetKind::TextArea { text } if w.short_name == short_name => Some(text.clone()),
                _ => None,
            })
    }

    pub fn menu(&self, subreddit: &str) -> Option<MenuData> {
        self.site()
            .topbar
            .get(&subreddit.to_lowercase())?
            .iter()
            .find_map(|w| match w {
                TopbarWidget::Menu { data, .. } => Some(data.clone()),
                TopbarWidget::Other { .. } => None,
            })
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn check(&self, site: &mut Site, op: Op) -> Result<(), PlatformError> {
        match site.failures.get(&op).cloned() {
            Some(failure) => {
                if failure.once {
                    site.failures.remove(&op);
                }
                Err(failure.error)
            }
            None => Ok(()),
        }
    }

    fn require_mod(&self, site: &Site, subreddit: &str) -> Result<(), PlatformError> {
        let is_mod = site
            .subreddits
            .get(&subreddit.to_lowercase())
            .is_some_and(|mods| mods.contains(&self.username));
        if is_mod {
            Ok(())
        } else {
            Err(PlatformError::Forbidden(format!(
                "u/{} is not a moderator of r/{subreddit}",
                self.username
            )))
        }
    }

    fn post_subreddit(site: &Site, id: &str) -> Result<String, PlatformError> {
        site.submissions
            .get(id)
            .map(|p| p.subreddit.clone())
            .ok_or_else(|| PlatformError::NotFound(format!("submission {id}")))
    }
}

impl Site {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("t{:x}", self.next_id)
    }
}

fn new_submission(
    id: &str,
    subreddit: &str,
    title: &str,
    author: &str,
    selftext: &str,
    created_utc: i64,
) -> Submission {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let permalink = format!("/r/{subreddit}/comments/{id}/{slug}/");
    Submission {
        id: id.to_string(),
        subreddit: subreddit.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        is_self: true,
        selftext: selftext.to_string(),
        created_utc,
        edited: None,
        url: format!("https://www.reddit.com{permalink}"),
        permalink,
        shortlink: format!("https://redd.it/{id}"),
    }
}

impl Platform for MemoryPlatform {
    fn username(&self) -> &str {
        &self.username
    }

    fn subreddit(&self, name: &str) -> Result<Subreddit, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::Subreddit)?;
        let key = name.to_lowercase();
        if !site.subreddits.contains_key(&key) {
            return Err(PlatformError::NotFound(format!("r/{name}")));
        }
        if site.private.contains(&key) {
            return Err(PlatformError::Forbidden(format!("r/{name} is private")));
        }
        Ok(Subreddit {
            name: name.to_string(),
        })
    }

    fn wiki_page(&self, subreddit: &str, page: &str) -> Result<WikiPage, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::WikiPage)?;
        site.wiki
            .get(&(subreddit.to_lowercase(), page.to_string()))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("wiki page {page}")))
    }

    fn edit_wiki_page(
        &self,
        subreddit: &str,
        page: &str,
        content: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::EditWiki)?;
        self.require_mod(&site, subreddit)?;
        let now = site.now;
        let key = (subreddit.to_lowercase(), page.to_string());
        let entry = site.wiki.entry(key).or_insert_with(|| WikiPage {
            name: page.to_string(),
            content_md: String::new(),
            revision_date: now,
        });
        entry.content_md = content.to_string();
        entry.revision_date = now;
        site.calls.push(Call::EditWiki {
            subreddit: subreddit.to_string(),
            page: page.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn submission(&self, id: &str) -> Result<Submission, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::Submission)?;
        site.submissions
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("submission {id}")))
    }

    fn edit_submission(&self, id: &str, selftext: &str) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::EditSubmission)?;
        let now = site.now;
        let post = site
            .submissions
            .get_mut(id)
            .ok_or_else(|| PlatformError::NotFound(format!("submission {id}")))?;
        if post.author != self.username {
            return Err(PlatformError::Forbidden(format!(
                "u/{} is not the author of {id}",
                self.username
            )));
        }
        if !post.is_self {
            return Err(PlatformError::Api {
                code: "NO_SELFS".to_string(),
                message: "link posts have no editable text".to_string(),
            });
        }
        post.selftext = selftext.to_string();
        post.edited = Some(now);
        site.calls.push(Call::EditSubmission { id: id.to_string() });
        Ok(())
    }

    fn submit_selfpost(
        &self,
        subreddit: &str,
        title: &str,
        selftext: &str,
    ) -> Result<Submission, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::Submit)?;
        if !site.subreddits.contains_key(&subreddit.to_lowercase()) {
            return Err(PlatformError::NotFound(format!("r/{subreddit}")));
        }
        let id = site.allocate_id();
        let post = new_submission(&id, subreddit, title, &self.username, selftext, site.now);
        site.submissions.insert(id, post.clone());
        site.calls.push(Call::Submit {
            subreddit: subreddit.to_string(),
            title: title.to_string(),
        });
        Ok(post)
    }

    fn set_inbox_replies(&self, id: &str, enabled: bool) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::SetInboxReplies)?;
        Self::post_subreddit(&site, id)?;
        site.inbox_replies.insert(id.to_string(), enabled);
        site.calls.push(Call::SetInboxReplies {
            id: id.to_string(),
            enabled,
        });
        Ok(())
    }

    fn approve(&self, id: &str) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::Approve)?;
        let subreddit = Self::post_subreddit(&site, id)?;
        self.require_mod(&site, &subreddit)?;
        site.approved.insert(id.to_string());
        site.calls.push(Call::Approve { id: id.to_string() });
        Ok(())
    }

    fn set_sticky(&self, id: &str, state: bool, bottom: bool) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::SetSticky)?;
        let subreddit = Self::post_subreddit(&site, id)?.to_lowercase();
        self.require_mod(&site, &subreddit)?;
        if state && site.needs_approval_to_sticky.contains(id) && !site.approved.contains(id) {
            return Err(PlatformError::BadRequest(format!("{id} must be approved first")));
        }
        site.calls.push(Call::SetSticky {
            id: id.to_string(),
            state,
            bottom,
        });

        if !state {
            if site.sticky_lag {
                site.pending_unsticky.push(id.to_string());
            } else if let Some(slots) = site.stickies.get_mut(&subreddit) {
                slots.retain(|s| s != id);
            }
            return Ok(());
        }

        let pending = std::mem::take(&mut site.pending_unsticky);
        let slots = site.stickies.entry(subreddit).or_default();
        slots.retain(|s| !pending.contains(s));
        if slots.iter().any(|s| s == id) {
            return Ok(());
        }
        if bottom {
            if slots.len() < 2 {
                slots.push(id.to_string());
            } else {
                slots[1] = id.to_string();
            }
        } else {
            slots.insert(0, id.to_string());
            slots.truncate(2);
        }
        Ok(())
    }

    fn sticky(&self, subreddit: &str, number: u8) -> Result<Submission, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::Sticky)?;
        let id = site
            .stickies
            .get(&subreddit.to_lowercase())
            .and_then(|slots| slots.get(usize::from(number).saturating_sub(1)))
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("no sticky in slot {number}")))?;
        site.submissions
            .get(&id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("submission {id}")))
    }

    fn reply(&self, id: &str, body: &str) -> Result<Comment, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::Reply)?;
        Self::post_subreddit(&site, id)?;
        let comment = Comment {
            id: format!("c{}", site.allocate_id()),
            body: body.to_string(),
        };
        site.comments.push(CommentRecord {
            parent: id.to_string(),
            comment: comment.clone(),
            author: self.username.clone(),
            distinguished_sticky: false,
        });
        site.calls.push(Call::Reply {
            parent: id.to_string(),
            comment: comment.id.clone(),
        });
        Ok(comment)
    }

    fn distinguish_comment(&self, comment_id: &str, sticky: bool) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::Distinguish)?;
        let parent = site
            .comments
            .iter()
            .find(|c| c.comment.id == comment_id)
            .map(|c| c.parent.clone())
            .ok_or_else(|| PlatformError::NotFound(format!("comment {comment_id}")))?;
        let subreddit = Self::post_subreddit(&site, &parent)?;
        self.require_mod(&site, &subreddit)?;
        if let Some(record) = site.comments.iter_mut().find(|c| c.comment.id == comment_id) {
            record.distinguished_sticky = sticky;
        }
        site.calls.push(Call::Distinguish {
            comment: comment_id.to_string(),
            sticky,
        });
        Ok(())
    }

    fn sidebar_widgets(&self, subreddit: &str) -> Result<Vec<SidebarWidget>, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::SidebarWidgets)?;
        Ok(site
            .sidebar
            .get(&subreddit.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    fn update_text_widget(
        &self,
        subreddit: &str,
        widget_id: &str,
        text: &str,
    ) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::UpdateTextWidget)?;
        self.require_mod(&site, subreddit)?;
        let widget = site
            .sidebar
            .get_mut(&subreddit.to_lowercase())
            .and_then(|ws| ws.iter_mut().find(|w| w.id == widget_id))
            .ok_or_else(|| PlatformError::NotFound(format!("widget {widget_id}")))?;
        match &mut widget.kind {
            WidgetKind::TextArea { text: current } => *current = text.to_string(),
            WidgetKind::Other { kind } => {
                return Err(PlatformError::BadRequest(format!("{kind} widgets have no text")))
            }
        }
        site.calls.push(Call::UpdateTextWidget {
            widget: widget_id.to_string(),
        });
        Ok(())
    }

    fn topbar_widgets(&self, subreddit: &str) -> Result<Vec<TopbarWidget>, PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::TopbarWidgets)?;
        Ok(site
            .topbar
            .get(&subreddit.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    fn update_menu_widget(
        &self,
        subreddit: &str,
        widget_id: &str,
        data: &MenuData,
    ) -> Result<(), PlatformError> {
        let mut site = self.site();
        self.check(&mut site, Op::UpdateMenu)?;
        self.require_mod(&site, subreddit)?;
        let widget = site
            .topbar
            .get_mut(&subreddit.to_lowercase())
            .and_then(|ws| {
                ws.iter_mut().find(|w| match w {
                    TopbarWidget::Menu { id, .. } | TopbarWidget::Other { id, .. } => id == widget_id,
                })
            })
            .ok_or_else(|| PlatformError::NotFound(format!("widget {widget_id}")))?;
        match widget {
            TopbarWidget::Menu { data: current, .. } => *current = data.clone(),
            TopbarWidget::Other { kind, .. } => {
                return Err(PlatformError::BadRequest(format!("{kind} widgets have no menu")))
            }
        }
        site.calls.push(Call::UpdateMenu {
            widget: widget_id.to_string(),
        });
        Ok(())
    }
}
