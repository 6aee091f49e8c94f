//! Static configuration models.
//!
//! These are the *rendered* shapes: cascading defaults have already been
//! merged in and every item carries its fully-qualified `uid`
//! (see [`crate::config::render_static_config`]).
//!
//! All types round-trip through serde + serde_yaml.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IntervalError;

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum FalseOr<T> {
    Flag(bool),
    Value(T),
}

/// Accepts `false`, `null` or a value; `false` and `null` both become `None`.
pub(crate) fn false_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<FalseOr<T>>::deserialize(de)? {
        None | Some(FalseOr::Flag(false)) => Ok(None),
        Some(FalseOr::Flag(true)) => Err(D::Error::custom("expected false or a value, found true")),
        Some(FalseOr::Value(v)) => Ok(Some(v)),
    }
}

fn none_as_false<S, T>(value: &Option<T>, ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: fmt::Display,
{
    match value {
        Some(v) => ser.collect_str(v),
        None => ser.serialize_bool(false),
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// The four content-bearing object kinds that can be synced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    Menu,
    Thread,
    Widget,
    #[default]
    WikiPage,
}

impl EndpointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Menu => "menu",
            EndpointType::Thread => "thread",
            EndpointType::Widget => "widget",
            EndpointType::WikiPage => "wiki_page",
        }
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which account acts, and in which subreddit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub account: String,
    pub subreddit: String,
}

/// Marker configuration delimiting the syncable region of a text.
///
/// `pattern: false` (the default) disables marker matching entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    #[serde(deserialize_with = "false_as_none", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub pattern_start: String,
    pub pattern_end: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            pattern: None,
            pattern_start: " Start".to_string(),
            pattern_end: " End".to_string(),
        }
    }
}

impl PatternConfig {
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }
}

pub const DEFAULT_MENU_PATTERN_TITLE: &str = r"\[([^\n\]]*)\]\(";
pub const DEFAULT_MENU_PATTERN_URL: &str = r"\]\(([^\s\)]*)[\s\)]";
pub const DEFAULT_MENU_PATTERN_SUBTITLE: &str = r"\[([^\n\]]*)\]\(";

/// Parameters of the Markdown-to-menu grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub split: String,
    pub subsplit: String,
    pub pattern_title: String,
    pub pattern_url: String,
    pub pattern_subtitle: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            split: "\n\n".to_string(),
            subsplit: "\n".to_string(),
            pattern_title: DEFAULT_MENU_PATTERN_TITLE.to_string(),
            pattern_url: DEFAULT_MENU_PATTERN_URL.to_string(),
            pattern_subtitle: DEFAULT_MENU_PATTERN_SUBTITLE.to_string(),
        }
    }
}

/// Identifies one resolvable content location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub context: ContextConfig,
    pub endpoint_name: String,
    #[serde(default)]
    pub endpoint_type: EndpointType,
}

impl EndpointConfig {
    pub fn new(
        uid: impl Into<String>,
        context: ContextConfig,
        endpoint_name: impl Into<String>,
        endpoint_type: EndpointType,
    ) -> Self {
        Self {
            uid: uid.into(),
            description: None,
            context,
            endpoint_name: endpoint_name.into(),
            endpoint_type,
        }
    }
}

/// An endpoint plus everything needed to read or write its synced region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullEndpointConfig {
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub pattern: PatternConfig,
    #[serde(default)]
    pub menu_config: MenuConfig,
    #[serde(default)]
    pub replace_patterns: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate_lines: Option<usize>,
}

impl FullEndpointConfig {
    pub fn new(endpoint: EndpointConfig) -> Self {
        Self {
            endpoint,
            enabled: true,
            pattern: PatternConfig::default(),
            menu_config: MenuConfig::default(),
            replace_patterns: IndexMap::new(),
            truncate_lines: None,
        }
    }

    pub fn uid(&self) -> &str {
        &self.endpoint.uid
    }
}

// ---------------------------------------------------------------------------
// Menu data
// ---------------------------------------------------------------------------

/// A single `{text, url}` menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuLink {
    pub text: String,
    pub url: String,
}

/// One top-level menu section: either a submenu with children or a plain link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuSection {
    Submenu { text: String, children: Vec<MenuLink> },
    Link(MenuLink),
}

impl MenuSection {
    pub fn text(&self) -> &str {
        match self {
            MenuSection::Submenu { text, .. } => text,
            MenuSection::Link(link) => &link.text,
        }
    }
}

/// Structured content of a topbar menu widget.
pub type MenuData = Vec<MenuSection>;

// ---------------------------------------------------------------------------
// Sync manager
// ---------------------------------------------------------------------------

/// One source kept in step with one or more targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItem {
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub source: FullEndpointConfig,
    #[serde(default)]
    pub targets: IndexMap<String, FullEndpointConfig>,
}

impl SyncItem {
    /// Human-facing name used in audit reasons.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.uid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncManagerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub items: IndexMap<String, SyncItem>,
}

impl Default for SyncManagerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            items: IndexMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Thread manager
// ---------------------------------------------------------------------------

/// Calendar unit a rotation interval is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Year => "year",
            IntervalUnit::Month => "month",
            IntervalUnit::Week => "week",
            IntervalUnit::Day => "day",
            IntervalUnit::Hour => "hour",
            IntervalUnit::Minute => "minute",
            IntervalUnit::Second => "second",
        }
    }

    /// Strips a trailing `s` and a trailing `ly` before matching.
    fn from_normalized(raw: &str) -> Option<Self> {
        let lower = raw.to_ascii_lowercase();
        let unit = lower.trim_end_matches('s');
        let unit = unit.strip_suffix("ly").unwrap_or(unit);
        match unit {
            "year" | "annual" => Some(IntervalUnit::Year),
            "month" => Some(IntervalUnit::Month),
            "week" => Some(IntervalUnit::Week),
            "day" | "dai" => Some(IntervalUnit::Day),
            "hour" => Some(IntervalUnit::Hour),
            "minute" => Some(IntervalUnit::Minute),
            "second" => Some(IntervalUnit::Second),
            _ => None,
        }
    }
}

/// Thread rotation interval.
///
/// `n == None` means "rotate when the calendar field named by `unit`
/// changes" (the month number alone for "month"); `Some(n)` means "rotate
/// once `n` units have elapsed". A bare "week" parses to `n = Some(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub unit: IntervalUnit,
    pub n: Option<u32>,
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| IntervalError {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = s.split_whitespace().collect();
        let (n, raw_unit) = match parts.as_slice() {
            [unit] => (None, *unit),
            [n, unit] => {
                let n: u32 = n.parse().map_err(|_| fail("count must be a positive integer"))?;
                (Some(n), *unit)
            }
            [] => return Err(fail("interval is empty")),
            _ => return Err(fail("expected '<unit>' or '<N> <unit>'")),
        };
        if n == Some(0) {
            return Err(fail("count must be at least 1"));
        }
        let unit = IntervalUnit::from_normalized(raw_unit).ok_or_else(|| {
            fail("unit must be one of year, month, week, day, hour, minute, second")
        })?;
        let n = match (unit, n) {
            (IntervalUnit::Week, None) => Some(1),
            (_, n) => n,
        };
        Ok(Interval { unit, n })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.n {
            None => f.write_str(self.unit.as_str()),
            Some(1) => write!(f, "1 {}", self.unit.as_str()),
            Some(n) => write!(f, "{n} {}s", self.unit.as_str()),
        }
    }
}

fn interval_or_false<'de, D>(de: D) -> Result<Option<Interval>, D::Error>
where
    D: Deserializer<'de>,
{
    match false_as_none::<D, String>(de)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(D::Error::custom),
    }
}

fn default_interval() -> Option<Interval> {
    Some(Interval {
        unit: IntervalUnit::Month,
        n: None,
    })
}

/// Where a freshly created thread goes in the sticky slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    /// Never touch pins.
    #[serde(rename = "none")]
    Disabled,
    /// Take over the slot the previous thread occupied, if any.
    #[default]
    Auto,
    Top,
    Bottom,
}

/// Bootstrap values for a thread item's dynamic state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialThreadConfig {
    #[serde(deserialize_with = "false_as_none", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub thread_number: u64,
}

pub const DEFAULT_PIN_SETTLE_MS: u64 = 2000;

fn default_pin_settle_ms() -> u64 {
    DEFAULT_PIN_SETTLE_MS
}

/// One recurring megathread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadItem {
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Moderation context: approving, pinning, link rewrites, sticky redirects.
    #[serde(default)]
    pub context: ContextConfig,
    /// Posting context: account and subreddit that submit the new thread.
    #[serde(default)]
    pub target_context: ContextConfig,
    pub source: FullEndpointConfig,
    #[serde(default = "default_true")]
    pub approve_new: bool,
    #[serde(default)]
    pub initial: InitialThreadConfig,
    #[serde(default)]
    pub link_update_pages: Vec<String>,
    #[serde(
        default = "default_interval",
        deserialize_with = "interval_or_false",
        serialize_with = "none_as_false"
    )]
    pub new_thread_interval: Option<Interval>,
    #[serde(default)]
    pub pin_mode: PinMode,
    #[serde(default = "default_pin_settle_ms")]
    pub pin_settle_ms: u64,
    /// Tera template; the renderer's embedded default is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_title_template: Option<String>,
    #[serde(default = "default_true")]
    pub redirect_op: bool,
    #[serde(default = "default_true")]
    pub redirect_sticky: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_template: Option<String>,
}

impl ThreadItem {
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.uid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadManagerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub items: IndexMap<String, ThreadItem>,
}

impl Default for ThreadManagerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            items: IndexMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Per-account settings handed to whatever builds the platform client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

pub const DEFAULT_REPEAT_INTERVAL_S: f64 = 60.0;

fn default_repeat_interval_s() -> f64 {
    DEFAULT_REPEAT_INTERVAL_S
}

/// The whole rendered static config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_repeat_interval_s")]
    pub repeat_interval_s: f64,
    pub accounts: IndexMap<String, AccountConfig>,
    #[serde(default)]
    pub context_default: ContextConfig,
    #[serde(default)]
    pub sync_manager: SyncManagerConfig,
    #[serde(default)]
    pub thread_manager: ThreadManagerConfig,
}
