//! Content-access capability consumed by the sync and thread managers.
//!
//! A [`Platform`] is one already-authenticated account. How it talks to the
//! site (transport, OAuth, rate limits) is the implementor's business; the
//! managers only see the blocking calls below and the [`PlatformError`]
//! classification they return.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MenuData;

/// Failure classes the managers distinguish between.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The object does not exist (HTTP 404 / redirect to search).
    #[error("not found: {0}")]
    NotFound(String),
    /// The object exists but the acting account may not read or change it.
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Structured API error such as `WIKI_CREATE_ERROR`.
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },
    #[error("connection error: {0}")]
    Connection(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, PlatformError::Forbidden(_))
    }
}

// ---------------------------------------------------------------------------
// Platform objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subreddit {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPage {
    pub name: String,
    pub content_md: String,
    /// Epoch seconds of the latest revision.
    pub revision_date: i64,
}

/// A post. Only self posts carry editable `selftext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub author: String,
    pub is_self: bool,
    pub selftext: String,
    pub created_utc: i64,
    /// Epoch seconds of the last edit, `None` if never edited.
    pub edited: Option<i64>,
    pub url: String,
    pub permalink: String,
    pub shortlink: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
}

/// A widget from the subreddit sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarWidget {
    pub id: String,
    pub short_name: String,
    pub kind: WidgetKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetKind {
    /// Markdown text area; the only sidebar kind we can sync into.
    TextArea { text: String },
    Other { kind: String },
}

impl WidgetKind {
    pub fn name(&self) -> &str {
        match self {
            WidgetKind::TextArea { .. } => "textarea",
            WidgetKind::Other { kind } => kind,
        }
    }
}

/// A widget from the subreddit topbar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopbarWidget {
    Menu { id: String, data: MenuData },
    Other { id: String, kind: String },
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Blocking operations on one authenticated account.
pub trait Platform: Send + Sync {
    /// Name of the acting user, used in permission error messages.
    fn username(&self) -> &str;

    fn subreddit(&self, name: &str) -> Result<Subreddit, PlatformError>;

    fn wiki_page(&self, subreddit: &str, page: &str) -> Result<WikiPage, PlatformError>;
    fn edit_wiki_page(
        &self,
        subreddit: &str,
        page: &str,
        content: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    fn submission(&self, id: &str) -> Result<Submission, PlatformError>;
    fn edit_submission(&self, id: &str, selftext: &str) -> Result<(), PlatformError>;
    fn submit_selfpost(
        &self,
        subreddit: &str,
        title: &str,
        selftext: &str,
    ) -> Result<Submission, PlatformError>;
    fn set_inbox_replies(&self, id: &str, enabled: bool) -> Result<(), PlatformError>;

    fn approve(&self, id: &str) -> Result<(), PlatformError>;
    /// Sticky or unsticky a post. `bottom` selects slot 2 when stickying.
    fn set_sticky(&self, id: &str, state: bool, bottom: bool) -> Result<(), PlatformError>;
    /// The post pinned in slot `number` (1 or 2); `NotFound` when the slot is empty.
    fn sticky(&self, subreddit: &str, number: u8) -> Result<Submission, PlatformError>;

    fn reply(&self, id: &str, body: &str) -> Result<Comment, PlatformError>;
    fn distinguish_comment(&self, comment_id: &str, sticky: bool) -> Result<(), PlatformError>;

    fn sidebar_widgets(&self, subreddit: &str) -> Result<Vec<SidebarWidget>, PlatformError>;
    fn update_text_widget(
        &self,
        subreddit: &str,
        widget_id: &str,
        text: &str,
    ) -> Result<(), PlatformError>;
    fn topbar_widgets(&self, subreddit: &str) -> Result<Vec<TopbarWidget>, PlatformError>;
    fn update_menu_widget(
        &self,
        subreddit: &str,
        widget_id: &str,
        data: &MenuData,
    ) -> Result<(), PlatformError>;
}

/// Authenticated platform handles keyed by account name from the config.
#[derive(Clone, Default)]
pub struct Accounts {
    platforms: IndexMap<String, Arc<dyn Platform>>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, platform: Arc<dyn Platform>) {
        self.platforms.insert(key.into(), platform);
    }

    pub fn with(mut self, key: impl Into<String>, platform: Arc<dyn Platform>) -> Self {
        self.insert(key, platform);
        self
    }

    pub fn get(&self, key: &str) -> Option<&dyn Platform> {
        self.platforms.get(key).map(|p| p.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }
}

impl fmt::Debug for Accounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accounts")
            .field("keys", &self.platforms.keys().collect::<Vec<_>>())
            .finish()
    }
}
