//! # submanager-renderer
//!
//! Tera templates for thread titles and the redirect notice left on a
//! retired thread.
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use submanager_renderer::{ThreadTemplateContext, ThreadTemplates};
//!
//! fn title() -> Result<String, submanager_renderer::RenderError> {
//!     let templates = ThreadTemplates::new(Some("{{ subreddit }} thread #{{ thread_number }}"), None)?;
//!     let ctx = ThreadTemplateContext::new(Utc::now(), "rust", 3, Some("abc12"));
//!     templates.render_title(&ctx)
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::ThreadTemplateContext;
pub use engine::ThreadTemplates;
pub use error::RenderError;
