//! Variables available to thread title and redirect templates.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use submanager_core::platform::Submission;

use crate::error::RenderError;

/// Flat rendering payload for one thread rotation.
///
/// The `thread_*` fields describe the *new* thread and stay empty until it
/// has been submitted; only the redirect template can rely on them.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadTemplateContext {
    pub current_datetime: DateTime<Utc>,
    pub current_datetime_local: DateTime<Local>,
    pub subreddit: String,
    pub thread_number: u64,
    pub thread_number_previous: u64,
    /// Empty when there was no previous thread.
    pub thread_id_previous: String,
    pub post_title: String,
    pub thread_id: String,
    pub thread_url: String,
    pub thread_permalink: String,
    pub thread_shortlink: String,
}

impl ThreadTemplateContext {
    pub fn new(
        now: DateTime<Utc>,
        subreddit: impl Into<String>,
        thread_number: u64,
        thread_id_previous: Option<&str>,
    ) -> Self {
        Self {
            current_datetime: now,
            current_datetime_local: now.with_timezone(&Local),
            subreddit: subreddit.into(),
            thread_number,
            thread_number_previous: thread_number.saturating_sub(1),
            thread_id_previous: thread_id_previous.unwrap_or_default().to_string(),
            post_title: String::new(),
            thread_id: String::new(),
            thread_url: String::new(),
            thread_permalink: String::new(),
            thread_shortlink: String::new(),
        }
    }

    /// Fill in the new thread's identity once it exists.
    pub fn set_thread(&mut self, thread: &Submission) {
        self.thread_id = thread.id.clone();
        self.thread_url = thread.url.clone();
        self.thread_permalink = thread.permalink.clone();
        self.thread_shortlink = thread.shortlink.clone();
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
