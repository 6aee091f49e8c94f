use std::path::PathBuf;

use thiserror::Error;

/// Error surface for a manage cycle and the repeat loop.
///
/// Per-item sync and thread failures are not errors here; they are reported
/// in the [`crate::CycleSummary`] and the cycle carries on.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] submanager_core::ConfigError),

    #[error("lock error: {0}")]
    Lock(#[from] submanager_core::LockError),

    #[error("thread keys {unknown:?} not found in configured keys {known:?}")]
    UnknownThreadKeys {
        unknown: Vec<String>,
        known: Vec<String>,
    },

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
