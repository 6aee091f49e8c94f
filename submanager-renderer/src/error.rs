//! Error types for submanager-renderer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A configured template failed to parse.
    #[error("invalid {name} template: {source}")]
    Template {
        name: &'static str,
        #[source]
        source: tera::Error,
    },

    /// Rendering a parsed template failed, usually an unknown variable.
    #[error("failed to render {name}: {source}")]
    Render {
        name: &'static str,
        #[source]
        source: tera::Error,
    },

    /// Building the tera context failed.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),
}
