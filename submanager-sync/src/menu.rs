//! Markdown to [`MenuData`] parsing for topbar menu targets.
//!
//! Parsing is tolerant: a section without a title, or a leaf section without
//! a URL, is dropped; a child without a title or URL is dropped without
//! affecting its siblings.

use regex::Regex;

use submanager_core::{MenuConfig, MenuData, MenuLink, MenuSection};

/// Compiled form of a [`MenuConfig`].
#[derive(Debug, Clone)]
pub struct MenuGrammar {
    split: String,
    subsplit: String,
    title: Regex,
    url: Regex,
    subtitle: Regex,
}

impl MenuGrammar {
    pub fn new(config: &MenuConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            split: config.split.clone(),
            subsplit: config.subsplit.clone(),
            title: Regex::new(&config.pattern_title)?,
            url: Regex::new(&config.pattern_url)?,
            subtitle: Regex::new(&config.pattern_subtitle)?,
        })
    }

    pub fn parse(&self, source: &str) -> MenuData {
        let source = source.replace("\r\n", "\n");
        split_and_clean(&source, &self.split)
            .into_iter()
            .filter_map(|section| self.parse_section(section))
            .collect()
    }

    fn parse_section(&self, section: &str) -> Option<MenuSection> {
        let parts = split_and_clean(section, &self.subsplit);
        let (head, rest) = parts.split_first()?;
        let text = extract(&self.title, head)?;
        if rest.is_empty() {
            let url = extract(&self.url, head)?;
            return Some(MenuSection::Link(MenuLink { text, url }));
        }
        let children = rest
            .iter()
            .filter_map(|child| {
                Some(MenuLink {
                    text: extract(&self.subtitle, child)?,
                    url: extract(&self.url, child)?,
                })
            })
            .collect();
        Some(MenuSection::Submenu { text, children })
    }
}

/// Parse `source` with a one-off grammar.
pub fn parse_menu(source: &str, config: &MenuConfig) -> Result<MenuData, regex::Error> {
    Ok(MenuGrammar::new(config)?.parse(source))
}

fn split_and_clean<'s>(text: &'s str, split: &str) -> Vec<&'s str> {
    let text = text.trim();
    let pieces: Vec<&str> = if split.is_empty() {
        vec![text]
    } else {
        text.split(split).collect()
    };
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// First capture group if the pattern has one that matched, else the whole match.
fn extract(pattern: &Regex, text: &str) -> Option<String> {
    let caps = pattern.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string())
}
