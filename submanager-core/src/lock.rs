//! Advisory cross-process lock over the dynamic state file.
//!
//! The lock is a sibling file `~<state file name>.lock` holding the owner's
//! pid followed by a newline. Creation is exclusive (`create_new`), so two
//! processes can never both believe they acquired it. A process only ever
//! deletes a lock file recording its own pid.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{lock_io_err, LockError};

pub const LOCK_TIMEOUT: Duration = Duration::from_secs(60);
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// `<dir>/~<file name>.lock` for the given state file.
pub fn lock_path(state_path: &Path) -> PathBuf {
    let name = state_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    state_path.with_file_name(format!("~{name}.lock"))
}

fn read_owner(lock: &Path) -> Result<Option<String>, LockError> {
    match std::fs::read_to_string(lock) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(lock_io_err(lock, e)),
    }
}

/// Try to take the lock once.
///
/// Returns `true` if this process now holds it (including when it already
/// did), `false` if another process holds it.
pub fn lock_config(state_path: &Path) -> Result<bool, LockError> {
    let lock = lock_path(state_path);
    let pid = std::process::id().to_string();
    match OpenOptions::new().write(true).create_new(true).open(&lock) {
        Ok(mut file) => {
            file.write_all(format!("{pid}\n").as_bytes())
                .map_err(|e| lock_io_err(&lock, e))?;
            file.sync_all().map_err(|e| lock_io_err(&lock, e))?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Ok(read_owner(&lock)?.as_deref() == Some(pid.as_str()))
        }
        Err(e) => Err(lock_io_err(&lock, e)),
    }
}

/// Release the lock if this process owns it.
///
/// `None` when there was no lock, `Some(false)` when another process owns
/// it (left in place), `Some(true)` when it was removed.
pub fn unlock_config(state_path: &Path) -> Result<Option<bool>, LockError> {
    let lock = lock_path(state_path);
    let Some(owner) = read_owner(&lock)? else {
        return Ok(None);
    };
    if owner != std::process::id().to_string() {
        return Ok(Some(false));
    }
    match std::fs::remove_file(&lock) {
        Ok(()) => Ok(Some(true)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(lock_io_err(&lock, e)),
    }
}

/// Poll [`lock_config`] every `poll_interval` until it succeeds or `timeout` elapses.
pub fn wait_for_lock(
    state_path: &Path,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), LockError> {
    let started = Instant::now();
    loop {
        if lock_config(state_path)? {
            return Ok(());
        }
        if started.elapsed() >= timeout {
            let lock = lock_path(state_path);
            let owner = read_owner(&lock)?.unwrap_or_else(|| "unknown".to_string());
            return Err(LockError::Timeout {
                path: lock,
                timeout,
                owner,
            });
        }
        std::thread::sleep(poll_interval);
    }
}

/// Holds the lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    state_path: PathBuf,
}

impl LockGuard {
    /// [`wait_for_lock`], returning a guard that unlocks on drop.
    pub fn acquire(
        state_path: &Path,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, LockError> {
        wait_for_lock(state_path, timeout, poll_interval)?;
        Ok(Self {
            state_path: state_path.to_path_buf(),
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = unlock_config(&self.state_path);
    }
}
