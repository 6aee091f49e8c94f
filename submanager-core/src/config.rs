//! Static config: load, render cascading defaults, validate, generate.
//!
//! # Default cascade
//!
//! ```text
//! sync_manager:   context_default ─▶ sync_manager.defaults ─▶ item.defaults ─▶ source / targets.<key>
//! thread_manager: context_default ─▶ thread_manager.defaults ─▶ item
//!                 item.context ─▶ item.source.context
//!                 item.context ─▶ item.target_context
//! ```
//!
//! Each arrow is one [`merge_values`] call; the right-hand side wins. Rendering
//! also stamps every item, source and target with its dotted `uid`, which
//! all later error messages use to name the offending config entry.

use std::path::Path;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::{io_err, ConfigError};
use crate::paths::ConfigPaths;
use crate::types::{ContextConfig, FullEndpointConfig, StaticConfig};

/// Commented example written by `generate-config`.
pub const EXAMPLE_CONFIG: &str = include_str!("example_config.yaml");

// ---------------------------------------------------------------------------
// 1. Merge + render
// ---------------------------------------------------------------------------

/// Deep-merge two YAML trees; `update` wins, nested mappings merge key by key.
pub fn merge_values(base: &Value, update: &Value) -> Value {
    match (base, update) {
        (Value::Mapping(base), Value::Mapping(update)) => {
            let mut out = base.clone();
            for (key, value) in update {
                let merged = match out.get(key) {
                    Some(existing) => merge_values(existing, value),
                    None => value.clone(),
                };
                out.insert(key.clone(), merged);
            }
            Value::Mapping(out)
        }
        (_, update) => update.clone(),
    }
}

fn empty() -> Value {
    Value::Mapping(Mapping::new())
}

fn single(key: &str, value: Value) -> Value {
    let mut m = Mapping::new();
    m.insert(Value::from(key), value);
    Value::Mapping(m)
}

fn invalid(uid: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        uid: uid.into(),
        message: message.into(),
    }
}

fn key_str(key: &Value, parent: &str) -> Result<String, ConfigError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(invalid(parent, "item keys must be scalars")),
    }
}

fn with_uid(mut value: Value, uid: String) -> Value {
    if let Value::Mapping(m) = &mut value {
        m.insert(Value::from("uid"), Value::from(uid));
    }
    value
}

/// Apply the default cascade and assign uids.
pub fn render_static_config(raw: Value) -> Result<Value, ConfigError> {
    let Value::Mapping(mut root) = raw else {
        return Err(invalid("<root>", "config must be a mapping"));
    };
    let context_default = root.get("context_default").cloned().unwrap_or_else(empty);
    let base = single("context", context_default);

    if let Some(Value::Mapping(manager)) = root.get_mut("sync_manager") {
        let manager_defaults = manager.remove("defaults").unwrap_or_else(empty);
        let manager_base = merge_values(&base, &manager_defaults);
        if let Some(Value::Mapping(items)) = manager.get_mut("items") {
            for (key, item) in items.iter_mut() {
                let uid = format!("sync_manager.items.{}", key_str(key, "sync_manager.items")?);
                let Value::Mapping(item) = item else {
                    return Err(invalid(uid, "sync item must be a mapping"));
                };
                let item_defaults = item.remove("defaults").unwrap_or_else(empty);
                let endpoint_base = merge_values(&manager_base, &item_defaults);
                if let Some(source) = item.get_mut("source") {
                    *source = with_uid(merge_values(&endpoint_base, source), format!("{uid}.source"));
                }
                if let Some(Value::Mapping(targets)) = item.get_mut("targets") {
                    for (target_key, target) in targets.iter_mut() {
                        let target_uid = format!("{uid}.targets.{}", key_str(target_key, &uid)?);
                        *target = with_uid(merge_values(&endpoint_base, target), target_uid);
                    }
                }
                item.insert(Value::from("uid"), Value::from(uid));
            }
        }
    }

    if let Some(Value::Mapping(manager)) = root.get_mut("thread_manager") {
        let manager_defaults = manager.remove("defaults").unwrap_or_else(empty);
        let item_base = merge_values(&base, &manager_defaults);
        if let Some(Value::Mapping(items)) = manager.get_mut("items") {
            for (key, item) in items.iter_mut() {
                let uid = format!("thread_manager.items.{}", key_str(key, "thread_manager.items")?);
                let mut merged = merge_values(&item_base, item);
                let Value::Mapping(m) = &mut merged else {
                    return Err(invalid(uid, "thread item must be a mapping"));
                };
                let context = m.get("context").cloned().unwrap_or_else(empty);
                if let Some(source) = m.get_mut("source") {
                    let source_base = single("context", context.clone());
                    *source = with_uid(merge_values(&source_base, source), format!("{uid}.source"));
                }
                let target_context = m.get("target_context").cloned().unwrap_or_else(empty);
                m.insert(
                    Value::from("target_context"),
                    merge_values(&context, &target_context),
                );
                m.insert(Value::from("uid"), Value::from(uid));
                *item = merged;
            }
        }
    }

    Ok(Value::Mapping(root))
}

// ---------------------------------------------------------------------------
// 2. Validate
// ---------------------------------------------------------------------------

fn check_context(config: &StaticConfig, uid: &str, context: &ContextConfig) -> Result<(), ConfigError> {
    if context.account.is_empty() {
        return Err(invalid(uid, "no account set (context.account or context_default.account)"));
    }
    if !config.accounts.contains_key(&context.account) {
        return Err(invalid(
            uid,
            format!("account '{}' is not defined under accounts", context.account),
        ));
    }
    if context.subreddit.is_empty() {
        return Err(invalid(uid, "no subreddit set (context.subreddit or context_default.subreddit)"));
    }
    Ok(())
}

fn check_endpoint(config: &StaticConfig, endpoint: &FullEndpointConfig) -> Result<(), ConfigError> {
    let uid = endpoint.uid();
    check_context(config, uid, &endpoint.endpoint.context)?;
    if endpoint.endpoint.endpoint_name.trim().is_empty() {
        return Err(invalid(uid, "endpoint_name must not be empty"));
    }
    let menu = &endpoint.menu_config;
    for (field, pattern) in [
        ("pattern_title", &menu.pattern_title),
        ("pattern_url", &menu.pattern_url),
        ("pattern_subtitle", &menu.pattern_subtitle),
    ] {
        Regex::new(pattern).map_err(|e| invalid(uid, format!("menu_config.{field}: {e}")))?;
    }
    if menu.split.is_empty() || menu.subsplit.is_empty() {
        return Err(invalid(uid, "menu_config split tokens must not be empty"));
    }
    Ok(())
}

/// Semantic checks that serde cannot express.
pub fn validate_static_config(config: &StaticConfig) -> Result<(), ConfigError> {
    if config.accounts.is_empty() {
        return Err(invalid("accounts", "at least one account must be configured"));
    }
    if !(config.repeat_interval_s.is_finite() && config.repeat_interval_s > 0.0) {
        return Err(invalid("repeat_interval_s", "must be a positive number of seconds"));
    }
    for item in config.sync_manager.items.values() {
        if item.targets.is_empty() {
            return Err(invalid(&item.uid, "sync item has no targets"));
        }
        check_endpoint(config, &item.source)?;
        for target in item.targets.values() {
            check_endpoint(config, target)?;
        }
    }
    for item in config.thread_manager.items.values() {
        check_context(config, &item.uid, &item.context)?;
        check_context(config, &format!("{}.target_context", item.uid), &item.target_context)?;
        check_endpoint(config, &item.source)?;
        for page in &item.link_update_pages {
            if page.trim().is_empty() {
                return Err(invalid(&item.uid, "link_update_pages entries must not be empty"));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Parse, render and validate YAML text; `path` is only used for error context.
pub fn parse_static_config(contents: &str, path: &Path) -> Result<StaticConfig, ConfigError> {
    let raw: Value = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let rendered = render_static_config(raw)?;
    let config: StaticConfig = serde_yaml::from_value(rendered).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate_static_config(&config)?;
    Ok(config)
}

/// Load the static config at `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with
/// path + line context) if malformed, `ConfigError::Invalid` naming the item
/// uid if it fails validation.
pub fn load_static_config_at(path: &Path) -> Result<StaticConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse_static_config(&contents, path)
}

/// `load_static_config_at` convenience wrapper using [`ConfigPaths::default_paths`].
pub fn load_static_config() -> Result<StaticConfig, ConfigError> {
    load_static_config_at(&ConfigPaths::default_paths()?.static_path)
}

// ---------------------------------------------------------------------------
// 4. Generate + atomic write
// ---------------------------------------------------------------------------

/// Write the example config to `path`.
///
/// Returns `Ok(false)` without touching an existing file when `exist_ok`,
/// `ConfigError::Exists` when neither `force` nor `exist_ok` is set.
pub fn generate_static_config_at(path: &Path, force: bool, exist_ok: bool) -> Result<bool, ConfigError> {
    if path.exists() && !force {
        if exist_ok {
            return Ok(false);
        }
        return Err(ConfigError::Exists {
            path: path.to_path_buf(),
        });
    }
    write_private_atomic(path, EXAMPLE_CONFIG)?;
    Ok(true)
}

/// Write flow: ensure parent dir → `<name>.tmp` sibling → `chmod 0600` → `rename`.
pub(crate) fn write_private_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{name}.tmp"));
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}
