//! Tera engine holding the post title and redirect templates of one thread item.

use tera::Tera;

use crate::context::ThreadTemplateContext;
use crate::error::RenderError;

pub const POST_TITLE: &str = "thread/post_title.tera";
pub const REDIRECT: &str = "thread/redirect.tera";

// ---------------------------------------------------------------------------
// Embedded defaults, baked in via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (POST_TITLE, include_str!("templates/post_title.tera")),
    (REDIRECT, include_str!("templates/redirect.tera")),
];

fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n")
}

fn build_tera(post_title: Option<&str>, redirect: Option<&str>) -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TPLS.iter().map(|(name, body)| (*name, normalize_newlines(body))))?;

    for (name, label, user) in [
        (POST_TITLE, "post title", post_title),
        (REDIRECT, "redirect", redirect),
    ] {
        if let Some(body) = user {
            tera.add_raw_template(name, &normalize_newlines(body))
                .map_err(|source| RenderError::Template { name: label, source })?;
        }
    }
    Ok(tera)
}

/// Parsed templates for one thread item.
///
/// Overrides from the item config replace the embedded defaults by name.
/// Syntax errors in an override surface from [`ThreadTemplates::new`]; the
/// thread crate's `check_templates` runs it for every item up front.
#[derive(Debug)]
pub struct ThreadTemplates {
    tera: Tera,
}

impl ThreadTemplates {
    pub fn new(post_title: Option<&str>, redirect: Option<&str>) -> Result<Self, RenderError> {
        Ok(Self {
            tera: build_tera(post_title, redirect)?,
        })
    }

    /// The embedded templates only.
    pub fn defaults() -> Result<Self, RenderError> {
        Self::new(None, None)
    }

    /// Render the post title, collapsed onto one line.
    pub fn render_title(&self, ctx: &ThreadTemplateContext) -> Result<String, RenderError> {
        let raw = self.render(POST_TITLE, "post title", ctx)?;
        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Render the redirect notice, trimmed.
    pub fn render_redirect(&self, ctx: &ThreadTemplateContext) -> Result<String, RenderError> {
        let raw = self.render(REDIRECT, "redirect", ctx)?;
        Ok(raw.trim().to_string())
    }

    fn render(
        &self,
        name: &str,
        label: &'static str,
        ctx: &ThreadTemplateContext,
    ) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        self.tera
            .render(name, &tera_ctx)
            .map_err(|source| RenderError::Render { name: label, source })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
