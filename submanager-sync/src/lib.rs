//! # submanager-sync
//!
//! Keeps target content regions in step with a source region.
//!
//! [`sync_one`] handles one [`SyncItem`](submanager_core::SyncItem);
//! [`sync_all`] runs every item of a manager with per-item isolation.
//! [`preview_one`] reports what a sync would change without writing.

pub mod endpoint;
pub mod error;
pub mod manager;
pub mod markers;
pub mod menu;
pub mod preview;
pub mod process;

pub use endpoint::{Content, Endpoint, EndpointObject};
pub use error::SyncError;
pub use manager::{sync_all, sync_one, SyncItemResult, SyncOutcome, TargetOutcome, TargetResult};
pub use markers::{marker_token, MarkerSearch};
pub use preview::{preview_one, PreviewChange, TargetPreview};
pub use process::{process_source, process_target};
