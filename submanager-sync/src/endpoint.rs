//! Resolved sync endpoints: wiki pages, threads, sidebar widgets and menus.
//!
//! An [`Endpoint`] is built by [`Endpoint::resolve`], which checks that the
//! subreddit and the named object exist for the acting account. All content
//! operations then dispatch on the resolved [`EndpointObject`].

use serde::Serialize;

use submanager_core::platform::{TopbarWidget, WidgetKind};
use submanager_core::{Accounts, EndpointConfig, EndpointType, MenuData, Platform, PlatformError};

use crate::error::{platform_err, SyncError};

const VALIDATION_REASON: &str = "Validation edit from Sub Manager";

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// What an endpoint holds: Markdown text, or structured menu data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Menu(MenuData),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Menu(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Menu(_) => "menu",
        }
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// The platform object an endpoint resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointObject {
    WikiPage { page: String },
    Thread { id: String, author: String, is_self: bool },
    Widget { id: String, short_name: String },
    Menu { id: String },
}

pub struct Endpoint<'a> {
    config: EndpointConfig,
    platform: &'a dyn Platform,
    object: EndpointObject,
}

impl std::fmt::Debug for Endpoint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("uid", &self.config.uid)
            .field("account", &self.platform.username())
            .field("object", &self.object)
            .finish()
    }
}

impl<'a> Endpoint<'a> {
    /// Resolve the subreddit, then the named object inside it.
    pub fn resolve(config: &EndpointConfig, accounts: &'a Accounts) -> Result<Self, SyncError> {
        let uid = config.uid.as_str();
        let account = config.context.account.as_str();
        let subreddit = config.context.subreddit.as_str();
        let platform = accounts.get(account).ok_or_else(|| SyncError::MissingAccount {
            uid: uid.to_string(),
            account: account.to_string(),
        })?;

        platform.subreddit(subreddit).map_err(|source| match source {
            PlatformError::NotFound(_) => SyncError::SubredditNotFound {
                uid: uid.to_string(),
                subreddit: subreddit.to_string(),
                source,
            },
            PlatformError::Forbidden(_) => SyncError::SubredditNotAccessible {
                uid: uid.to_string(),
                subreddit: subreddit.to_string(),
                account: account.to_string(),
                source,
            },
            other => platform_err(uid, other),
        })?;

        let object = match config.endpoint_type {
            EndpointType::WikiPage => resolve_wiki_page(config, platform)?,
            EndpointType::Thread => resolve_thread(config, platform)?,
            EndpointType::Widget => resolve_widget(config, platform)?,
            EndpointType::Menu => resolve_menu(config, platform)?,
        };
        Ok(Self {
            config: config.clone(),
            platform,
            object,
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn uid(&self) -> &str {
        &self.config.uid
    }

    pub fn object(&self) -> &EndpointObject {
        &self.object
    }

    fn subreddit(&self) -> &str {
        &self.config.context.subreddit
    }

    /// Thread and wiki page endpoints track revisions; widgets and menus
    /// are treated as changed on every cycle.
    pub fn supports_revision_date(&self) -> bool {
        matches!(
            self.object,
            EndpointObject::WikiPage { .. } | EndpointObject::Thread { .. }
        )
    }

    /// Last modification, epoch seconds. `None` when unsupported.
    ///
    /// A thread that was never edited reports its creation time.
    pub fn revision_date(&self) -> Result<Option<i64>, SyncError> {
        match &self.object {
            EndpointObject::WikiPage { page } => {
                let page = self
                    .platform
                    .wiki_page(self.subreddit(), page)
                    .map_err(|e| self.read_err(e))?;
                Ok(Some(page.revision_date))
            }
            EndpointObject::Thread { id, .. } => {
                let post = self.platform.submission(id).map_err(|e| self.read_err(e))?;
                Ok(Some(post.edited.unwrap_or(post.created_utc)))
            }
            EndpointObject::Widget { .. } | EndpointObject::Menu { .. } => Ok(None),
        }
    }

    pub fn content(&self) -> Result<Content, SyncError> {
        match &self.object {
            EndpointObject::WikiPage { page } => self
                .platform
                .wiki_page(self.subreddit(), page)
                .map(|page| Content::Text(page.content_md))
                .map_err(|e| self.read_err(e)),
            EndpointObject::Thread { id, .. } => self
                .platform
                .submission(id)
                .map(|post| Content::Text(post.selftext))
                .map_err(|e| self.read_err(e)),
            EndpointObject::Widget { id, short_name } => {
                let widgets = self
                    .platform
                    .sidebar_widgets(self.subreddit())
                    .map_err(|e| self.read_err(e))?;
                let widget = widgets.into_iter().find(|w| &w.id == id).ok_or_else(|| {
                    SyncError::ObjectNotFound {
                        uid: self.uid().to_string(),
                        message: format!("sidebar widget '{short_name}' disappeared"),
                    }
                })?;
                match widget.kind {
                    WidgetKind::TextArea { text } => Ok(Content::Text(text)),
                    other => Err(SyncError::WidgetType {
                        uid: self.uid().to_string(),
                        widget: short_name.clone(),
                        kind: other.name().to_string(),
                    }),
                }
            }
            EndpointObject::Menu { id } => {
                let widgets = self
                    .platform
                    .topbar_widgets(self.subreddit())
                    .map_err(|e| self.read_err(e))?;
                widgets
                    .into_iter()
                    .find_map(|w| match w {
                        TopbarWidget::Menu { id: found, data } if &found == id => Some(data),
                        _ => None,
                    })
                    .map(Content::Menu)
                    .ok_or_else(|| SyncError::ObjectNotFound {
                        uid: self.uid().to_string(),
                        message: format!("menu widget disappeared from r/{}", self.subreddit()),
                    })
            }
        }
    }

    /// Overwrite the endpoint's content. No diffing happens here.
    pub fn edit(&self, content: &Content, reason: &str) -> Result<(), SyncError> {
        let uid = self.uid();
        let result = match (&self.object, content) {
            (EndpointObject::WikiPage { page }, Content::Text(text)) => {
                self.platform.edit_wiki_page(self.subreddit(), page, text, reason)
            }
            (EndpointObject::Thread { id, is_self, .. }, Content::Text(text)) => {
                if !is_self {
                    return Err(SyncError::PostType {
                        uid: uid.to_string(),
                        thread_id: id.clone(),
                    });
                }
                self.platform.edit_submission(id, text)
            }
            (EndpointObject::Widget { id, .. }, Content::Text(text)) => {
                self.platform.update_text_widget(self.subreddit(), id, text)
            }
            (EndpointObject::Menu { id }, Content::Menu(data)) => {
                self.platform.update_menu_widget(self.subreddit(), id, data)
            }
            (_, other) => {
                return Err(SyncError::ContentMismatch {
                    uid: uid.to_string(),
                    content: other.kind(),
                    endpoint_type: self.config.endpoint_type,
                })
            }
        };
        result.map_err(|e| platform_err(uid, e))
    }

    /// Probe whether the acting account may write this endpoint by
    /// rewriting its current content.
    ///
    /// With `raise_on_failure` a permission failure becomes the matching
    /// error variant; otherwise it is reported as `Ok(false)`. Failures that
    /// are not permission problems always propagate.
    pub fn check_is_editable(&self, raise_on_failure: bool) -> Result<bool, SyncError> {
        let current = self.content()?;
        let uid = self.uid().to_string();
        let account = self.config.context.account.clone();
        let probe = match (&self.object, &current) {
            (EndpointObject::WikiPage { page }, Content::Text(text)) => self
                .platform
                .edit_wiki_page(self.subreddit(), page, text, VALIDATION_REASON)
                .map_err(|source| {
                    let denied = match &source {
                        PlatformError::Forbidden(_) => true,
                        PlatformError::Api { code, .. } => code.eq_ignore_ascii_case("WIKI_CREATE_ERROR"),
                        _ => false,
                    };
                    if denied {
                        SyncError::WikiPagePermission {
                            uid,
                            account,
                            page: page.clone(),
                            source,
                        }
                    } else {
                        platform_err(self.uid(), source)
                    }
                }),
            (EndpointObject::Thread { id, author, is_self }, Content::Text(text)) => {
                if !is_self {
                    Err(SyncError::PostType {
                        uid,
                        thread_id: id.clone(),
                    })
                } else {
                    self.platform
                        .edit_submission(id, text)
                        .map_err(|source| match source {
                            PlatformError::Forbidden(_) => SyncError::NotOp {
                                uid,
                                account,
                                author: author.clone(),
                                thread_id: id.clone(),
                                source,
                            },
                            other => platform_err(self.uid(), other),
                        })
                }
            }
            (EndpointObject::Widget { id, .. }, Content::Text(text)) => self
                .platform
                .update_text_widget(self.subreddit(), id, text)
                .map_err(|source| self.not_a_mod(source)),
            (EndpointObject::Menu { id }, Content::Menu(data)) => self
                .platform
                .update_menu_widget(self.subreddit(), id, data)
                .map_err(|source| self.not_a_mod(source)),
            (_, other) => Err(SyncError::ContentMismatch {
                uid,
                content: other.kind(),
                endpoint_type: self.config.endpoint_type,
            }),
        };

        match probe {
            Ok(()) => Ok(true),
            Err(err) if !raise_on_failure && is_permission_error(&err) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn not_a_mod(&self, source: PlatformError) -> SyncError {
        match source {
            PlatformError::Forbidden(_) => SyncError::NotAMod {
                uid: self.uid().to_string(),
                account: self.config.context.account.clone(),
                subreddit: self.subreddit().to_string(),
                source,
            },
            other => platform_err(self.uid(), other),
        }
    }

    fn read_err(&self, source: PlatformError) -> SyncError {
        object_err(&self.config, source)
    }
}

fn is_permission_error(err: &SyncError) -> bool {
    matches!(
        err,
        SyncError::NotAMod { .. }
            | SyncError::NotOp { .. }
            | SyncError::PostType { .. }
            | SyncError::WikiPagePermission { .. }
    )
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

fn object_err(config: &EndpointConfig, source: PlatformError) -> SyncError {
    let what = format!(
        "{} '{}' in r/{}",
        config.endpoint_type, config.endpoint_name, config.context.subreddit
    );
    match source {
        PlatformError::NotFound(_) => SyncError::ObjectNotFound {
            uid: config.uid.clone(),
            message: format!("{what} not found"),
        },
        PlatformError::Forbidden(_) => SyncError::ObjectNotAccessible {
            uid: config.uid.clone(),
            message: format!(
                "{what} found but not accessible from u/{}",
                config.context.account
            ),
            source,
        },
        other => platform_err(&config.uid, other),
    }
}

fn resolve_wiki_page(config: &EndpointConfig, platform: &dyn Platform) -> Result<EndpointObject, SyncError> {
    let page = platform
        .wiki_page(&config.context.subreddit, &config.endpoint_name)
        .map_err(|e| object_err(config, e))?;
    Ok(EndpointObject::WikiPage { page: page.name })
}

fn resolve_thread(config: &EndpointConfig, platform: &dyn Platform) -> Result<EndpointObject, SyncError> {
    let post = platform
        .submission(&config.endpoint_name)
        .map_err(|e| object_err(config, e))?;
    Ok(EndpointObject::Thread {
        id: post.id,
        author: post.author,
        is_self: post.is_self,
    })
}

fn resolve_widget(config: &EndpointConfig, platform: &dyn Platform) -> Result<EndpointObject, SyncError> {
    let widgets = platform
        .sidebar_widgets(&config.context.subreddit)
        .map_err(|e| object_err(config, e))?;
    let mut names = Vec::new();
    for widget in widgets {
        if widget.short_name.is_empty() {
            continue;
        }
        if widget.short_name == config.endpoint_name {
            return match widget.kind {
                WidgetKind::TextArea { .. } => Ok(EndpointObject::Widget {
                    id: widget.id,
                    short_name: widget.short_name,
                }),
                other => Err(SyncError::WidgetType {
                    uid: config.uid.clone(),
                    widget: widget.short_name,
                    kind: other.name().to_string(),
                }),
            };
        }
        names.push(widget.short_name);
    }
    let found = if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    };
    Err(SyncError::ObjectNotFound {
        uid: config.uid.clone(),
        message: format!(
            "sidebar widget '{}' not found in r/{} (found widgets: {found}); create it first if this is not a typo",
            config.endpoint_name, config.context.subreddit
        ),
    })
}

fn resolve_menu(config: &EndpointConfig, platform: &dyn Platform) -> Result<EndpointObject, SyncError> {
    let widgets = platform
        .topbar_widgets(&config.context.subreddit)
        .map_err(|e| object_err(config, e))?;
    widgets
        .into_iter()
        .find_map(|w| match w {
            TopbarWidget::Menu { id, .. } => Some(EndpointObject::Menu { id }),
            TopbarWidget::Other { .. } => None,
        })
        .ok_or_else(|| SyncError::ObjectNotFound {
            uid: config.uid.clone(),
            message: format!(
                "menu widget not found in r/{}; create it by adding at least one menu item",
                config.context.subreddit
            ),
        })
}
