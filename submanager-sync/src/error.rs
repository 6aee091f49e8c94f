//! Error types for submanager-sync.

use thiserror::Error;

use submanager_core::{EndpointType, PlatformError};

/// Everything that can abort a sync item.
///
/// Every variant names the fully-qualified uid of the endpoint or item it
/// concerns. Marker misses are not errors; they surface as skipped outcomes.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{uid}: sync item has no targets")]
    NoTargets { uid: String },

    #[error("{uid}: account '{account}' is not configured")]
    MissingAccount { uid: String, account: String },

    #[error("{uid}: subreddit r/{subreddit} not found")]
    SubredditNotFound {
        uid: String,
        subreddit: String,
        #[source]
        source: PlatformError,
    },

    #[error("{uid}: subreddit r/{subreddit} found but not accessible from u/{account}")]
    SubredditNotAccessible {
        uid: String,
        subreddit: String,
        account: String,
        #[source]
        source: PlatformError,
    },

    #[error("{uid}: {message}")]
    ObjectNotFound { uid: String, message: String },

    #[error("{uid}: {message}")]
    ObjectNotAccessible {
        uid: String,
        message: String,
        #[source]
        source: PlatformError,
    },

    #[error("{uid}: account u/{account} must be a moderator of r/{subreddit} to update widgets")]
    NotAMod {
        uid: String,
        account: String,
        subreddit: String,
        #[source]
        source: PlatformError,
    },

    #[error("{uid}: account u/{account} must be the author (u/{author}) of thread {thread_id} to edit it")]
    NotOp {
        uid: String,
        account: String,
        author: String,
        thread_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("{uid}: thread {thread_id} is a link post; only self posts can be synced")]
    PostType { uid: String, thread_id: String },

    #[error("{uid}: account u/{account} must be authorized to edit wiki page '{page}'")]
    WikiPagePermission {
        uid: String,
        account: String,
        page: String,
        #[source]
        source: PlatformError,
    },

    #[error("{uid}: widget '{widget}' has unsupported type '{kind}'; only text widgets can be synced")]
    WidgetType {
        uid: String,
        widget: String,
        kind: String,
    },

    #[error("{uid}: invalid menu pattern: {source}")]
    MenuPattern {
        uid: String,
        #[source]
        source: regex::Error,
    },

    #[error("{uid}: cannot write {content} content to a {endpoint_type} endpoint")]
    ContentMismatch {
        uid: String,
        content: &'static str,
        endpoint_type: EndpointType,
    },

    #[error("{uid}: {source}")]
    Platform {
        uid: String,
        #[source]
        source: PlatformError,
    },
}

impl SyncError {
    /// Fully-qualified id of the offending config item.
    pub fn uid(&self) -> &str {
        match self {
            SyncError::NoTargets { uid }
            | SyncError::MissingAccount { uid, .. }
            | SyncError::SubredditNotFound { uid, .. }
            | SyncError::SubredditNotAccessible { uid, .. }
            | SyncError::ObjectNotFound { uid, .. }
            | SyncError::ObjectNotAccessible { uid, .. }
            | SyncError::NotAMod { uid, .. }
            | SyncError::NotOp { uid, .. }
            | SyncError::PostType { uid, .. }
            | SyncError::WikiPagePermission { uid, .. }
            | SyncError::WidgetType { uid, .. }
            | SyncError::MenuPattern { uid, .. }
            | SyncError::ContentMismatch { uid, .. }
            | SyncError::Platform { uid, .. } => uid,
        }
    }
}

/// Convenience constructor for [`SyncError::Platform`].
pub(crate) fn platform_err(uid: &str, source: PlatformError) -> SyncError {
    SyncError::Platform {
        uid: uid.to_string(),
        source,
    }
}
