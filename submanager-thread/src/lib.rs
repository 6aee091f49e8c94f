//! # submanager-thread
//!
//! Recurring megathreads: decide when a thread is due for replacement, post
//! its successor, and keep the current one synced between rotations.

pub mod error;
pub mod interval;
pub mod lifecycle;
pub mod manager;
mod pins;

pub use error::ThreadError;
pub use interval::{interval_elapsed, should_rotate};
pub use lifecycle::{
    check_templates, create_new_thread, thread_body, update_page_links, NewThread,
    THREAD_PATTERN,
};
pub use manager::{
    manage_thread, manage_thread_at, manage_threads, manage_threads_at, sync_thread, ThreadItemResult,
    ThreadOutcome,
};
