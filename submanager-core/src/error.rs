//! Error types for submanager-core.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading, rendering, validating or saving config files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error (dynamic state write path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Static config could not be parsed; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Dynamic state file could not be parsed.
    #[error("failed to parse dynamic state at {path}: {source}")]
    ParseState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// Refused to overwrite an existing config file.
    #[error("config already exists at {path}; pass force to overwrite")]
    Exists { path: PathBuf },

    /// Rendered config is structurally valid YAML but semantically wrong.
    #[error("invalid config at {uid}: {message}")]
    Invalid { uid: String, message: String },

    /// `dirs` could not locate a platform config or state directory.
    #[error("cannot determine the {kind} directory; set $HOME or equivalent")]
    DirNotFound { kind: &'static str },
}

/// Errors from the dynamic-state lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("I/O error on lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process kept the lock for longer than the allowed wait.
    #[error("timed out after {timeout:?} waiting for lock {path} (held by pid {owner})")]
    Timeout {
        path: PathBuf,
        timeout: Duration,
        owner: String,
    },
}

/// Parse failure for a thread rotation interval such as `"2 weeks"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid interval '{input}': {reason}")]
pub struct IntervalError {
    pub input: String,
    pub reason: String,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn lock_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LockError {
    LockError::Io {
        path: path.into(),
        source,
    }
}
