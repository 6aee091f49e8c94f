//! Marker regions and the plain-text transforms applied around them.
//!
//! A marker is an empty Markdown link, `[](/# <pattern><suffix>)`, which the
//! site renders as nothing but keeps verbatim in the raw text. The syncable
//! region of a text is everything between the first start marker and the
//! first end marker following it.

use std::ops::Range;

use indexmap::IndexMap;

use submanager_core::PatternConfig;

/// Render one marker token.
pub fn marker_token(marker: &str) -> String {
    format!("[](/# {marker})")
}

/// Result of looking for a marker region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerSearch {
    /// No markers configured: the whole text is the region.
    Disabled,
    /// Markers configured, but no complete start..end span in the text.
    NotFound,
    /// Byte range of the region, markers excluded.
    Found(Range<usize>),
}

/// `None` when marker matching is switched off for this config.
fn marker_tokens(pattern: &PatternConfig) -> Option<(String, String)> {
    let base = pattern.pattern.as_deref()?;
    if base.is_empty() && pattern.pattern_start.is_empty() && pattern.pattern_end.is_empty() {
        return None;
    }
    Some((
        marker_token(&format!("{base}{}", pattern.pattern_start)),
        marker_token(&format!("{base}{}", pattern.pattern_end)),
    ))
}

pub fn search_markers(text: &str, pattern: &PatternConfig) -> MarkerSearch {
    let Some((start, end)) = marker_tokens(pattern) else {
        return MarkerSearch::Disabled;
    };
    let Some(start_at) = text.find(&start) else {
        return MarkerSearch::NotFound;
    };
    let region_start = start_at + start.len();
    match text[region_start..].find(&end) {
        Some(offset) => MarkerSearch::Found(region_start..region_start + offset),
        None => MarkerSearch::NotFound,
    }
}

/// The syncable region of `text`, or `None` if configured markers are missing.
pub fn extract_region<'t>(text: &'t str, pattern: &PatternConfig) -> Option<&'t str> {
    match search_markers(text, pattern) {
        MarkerSearch::Disabled => Some(text),
        MarkerSearch::NotFound => None,
        MarkerSearch::Found(range) => Some(&text[range]),
    }
}

/// Replace the syncable region of `text` with `value`.
///
/// The whitespace framing the old region is kept around the new value, so a
/// region laid out as `\n\n...\n\n` stays that way while a tight
/// `Start)...[](` region stays tight. Marker tokens are never touched.
/// Returns `None` if configured markers are missing.
pub fn replace_region(text: &str, pattern: &PatternConfig, value: &str) -> Option<String> {
    match search_markers(text, pattern) {
        MarkerSearch::Disabled => Some(reframe(text, value)),
        MarkerSearch::NotFound => None,
        MarkerSearch::Found(range) => {
            let mut out = String::with_capacity(text.len() + value.len());
            out.push_str(&text[..range.start]);
            out.push_str(&reframe(&text[range.clone()], value));
            out.push_str(&text[range.end..]);
            Some(out)
        }
    }
}

/// `value` (trimmed) wrapped in the leading and trailing whitespace of `old`.
/// An all-whitespace `old` is used on both sides.
fn reframe(old: &str, value: &str) -> String {
    let value = value.trim();
    let body = old.trim();
    let (lead, trail) = if body.is_empty() {
        (old, old)
    } else {
        let lead_len = old.len() - old.trim_start().len();
        let trail_len = old.len() - old.trim_end().len();
        (&old[..lead_len], &old[old.len() - trail_len..])
    };
    if value.is_empty() {
        return lead.to_string();
    }
    format!("{lead}{value}{trail}")
}

/// Apply literal find/replace pairs in configured order.
pub fn replace_patterns(text: &str, patterns: &IndexMap<String, String>) -> String {
    patterns
        .iter()
        .filter(|(old, _)| !old.is_empty())
        .fold(text.to_string(), |acc, (old, new)| acc.replace(old.as_str(), new))
}

/// Keep at most `max` lines. `None` or `Some(0)` keeps everything.
pub fn truncate_lines(text: &str, max: Option<usize>) -> String {
    match max {
        Some(n) if n > 0 => text.lines().take(n).collect::<Vec<_>>().join("\n"),
        _ => text.to_string(),
    }
}
