//! Error types for submanager-thread.

use thiserror::Error;

use submanager_core::PlatformError;
use submanager_renderer::RenderError;
use submanager_sync::SyncError;

#[derive(Debug, Error)]
pub enum ThreadError {
    /// Endpoint resolution or syncing failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("{uid}: {source}")]
    Render {
        uid: String,
        #[source]
        source: RenderError,
    },

    #[error("{uid}: no current thread id; one must exist before the thread can be synced")]
    MissingThreadId { uid: String },

    #[error("{uid}: source has no text to post (sync markers missing or not a text endpoint)")]
    SourceUnavailable { uid: String },

    #[error("{uid}: account '{account}' is not configured")]
    MissingAccount { uid: String, account: String },

    #[error("{uid}: invalid link pattern: {source}")]
    LinkPattern {
        uid: String,
        #[source]
        source: regex::Error,
    },

    /// The new thread was posted but a later step failed.
    #[error("{uid}: posted thread {thread_id} but could not finish the rotation: {source}")]
    RotationIncomplete {
        uid: String,
        thread_id: String,
        #[source]
        source: Box<ThreadError>,
    },

    #[error("{uid}: {source}")]
    Platform {
        uid: String,
        #[source]
        source: PlatformError,
    },
}

impl ThreadError {
    pub fn uid(&self) -> &str {
        match self {
            ThreadError::Sync(err) => err.uid(),
            ThreadError::Render { uid, .. }
            | ThreadError::MissingThreadId { uid }
            | ThreadError::SourceUnavailable { uid }
            | ThreadError::MissingAccount { uid, .. }
            | ThreadError::LinkPattern { uid, .. }
            | ThreadError::RotationIncomplete { uid, .. }
            | ThreadError::Platform { uid, .. } => uid,
        }
    }

    /// Id of a thread that was posted before the failure, if any.
    pub fn posted_thread(&self) -> Option<&str> {
        match self {
            ThreadError::RotationIncomplete { thread_id, .. } => Some(thread_id),
            _ => None,
        }
    }
}

/// Convenience constructor for [`ThreadError::Platform`].
pub(crate) fn platform_err(uid: &str) -> impl FnOnce(PlatformError) -> ThreadError + '_ {
    move |source| ThreadError::Platform {
        uid: uid.to_string(),
        source,
    }
}
