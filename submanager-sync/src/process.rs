//! Source extraction and target transformation.

use submanager_core::{DynamicSyncState, EndpointType, FullEndpointConfig, MenuConfig};

use crate::endpoint::{Content, Endpoint};
use crate::error::SyncError;
use crate::markers::{extract_region, replace_patterns, replace_region, truncate_lines};
use crate::menu::parse_menu;

/// Read the source if it changed since the last recorded revision.
///
/// Returns `None` when the source revision is not newer than
/// `state.source_timestamp`, or when configured markers are missing from the
/// source text. A newer revision is recorded in `state` before the content
/// is read.
pub fn process_source(
    config: &FullEndpointConfig,
    source: &Endpoint<'_>,
    state: &mut DynamicSyncState,
) -> Result<Option<Content>, SyncError> {
    if let Some(timestamp) = source.revision_date()? {
        if timestamp <= state.source_timestamp {
            tracing::debug!(
                "source {} unchanged since {}",
                source.uid(),
                state.source_timestamp
            );
            return Ok(None);
        }
        state.source_timestamp = timestamp;
    }

    match source.content()? {
        Content::Menu(data) => Ok(Some(Content::Menu(data))),
        Content::Text(text) => {
            let Some(region) = extract_region(&text, &config.pattern) else {
                tracing::warn!(
                    "skipping {}: sync pattern not found in source",
                    source.uid()
                );
                return Ok(None);
            };
            let region = replace_patterns(region, &config.replace_patterns);
            Ok(Some(Content::Text(truncate_lines(&region, config.truncate_lines))))
        }
    }
}

/// What a target currently holds and what it should hold after syncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlan {
    pub current: Content,
    pub new: Content,
}

impl TargetPlan {
    pub fn is_noop(&self) -> bool {
        self.current == self.new
    }
}

/// Compute the new content for one target without writing it.
///
/// `None` means configured markers are missing from the target.
pub fn plan_target(
    config: &FullEndpointConfig,
    target: &Endpoint<'_>,
    source_content: &Content,
    menu_config: &MenuConfig,
) -> Result<Option<TargetPlan>, SyncError> {
    let source_content = match source_content {
        Content::Text(text) => Content::Text(replace_patterns(text, &config.replace_patterns)),
        Content::Menu(data) => Content::Menu(data.clone()),
    };
    let current = target.content()?;

    let new = match (&source_content, &current) {
        (Content::Text(text), _) if config.endpoint.endpoint_type == EndpointType::Menu => {
            let data = parse_menu(text, menu_config).map_err(|source| SyncError::MenuPattern {
                uid: target.uid().to_string(),
                source,
            })?;
            Content::Menu(data)
        }
        (Content::Menu(data), _) if config.endpoint.endpoint_type == EndpointType::Menu => {
            Content::Menu(data.clone())
        }
        (Content::Text(text), Content::Text(existing)) => {
            match replace_region(existing, &config.pattern, text) {
                Some(updated) => Content::Text(updated),
                None => {
                    tracing::warn!(
                        "skipping {}: sync pattern not found in target",
                        target.uid()
                    );
                    return Ok(None);
                }
            }
        }
        _ => current.clone(),
    };
    Ok(Some(TargetPlan { current, new }))
}

/// New content for one target, or `None` if its markers are missing.
pub fn process_target(
    config: &FullEndpointConfig,
    target: &Endpoint<'_>,
    source_content: &Content,
    menu_config: &MenuConfig,
) -> Result<Option<Content>, SyncError> {
    Ok(plan_target(config, target, source_content, menu_config)?.map(|plan| plan.new))
}
