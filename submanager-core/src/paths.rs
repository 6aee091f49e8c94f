//! Default locations of the static config and dynamic state files.
//!
//! Every path has an `_at(dir)` form taking an explicit base directory; tests
//! must use those rather than the `dirs`-based defaults.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const APP_DIR: &str = "submanager";
pub const STATIC_CONFIG_FILE: &str = "config.yaml";
pub const DYNAMIC_CONFIG_FILE: &str = "config_dynamic.json";

/// Where the two config files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub static_path: PathBuf,
    pub dynamic_path: PathBuf,
}

impl ConfigPaths {
    /// Both files side by side in `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            static_path: dir.join(STATIC_CONFIG_FILE),
            dynamic_path: dir.join(DYNAMIC_CONFIG_FILE),
        }
    }

    /// `<config dir>/submanager/config.yaml` and `<state dir>/submanager/config_dynamic.json`.
    pub fn default_paths() -> Result<Self, ConfigError> {
        Ok(Self {
            static_path: static_config_path_at(&config_base()?),
            dynamic_path: dynamic_config_path_at(&state_base()?),
        })
    }

    /// Apply optional overrides from the command line.
    pub fn with_overrides(
        mut self,
        static_path: Option<PathBuf>,
        dynamic_path: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = static_path {
            self.static_path = p;
        }
        if let Some(p) = dynamic_path {
            self.dynamic_path = p;
        }
        self
    }
}

/// `<base>/submanager/config.yaml`. Pure, no I/O.
pub fn static_config_path_at(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(STATIC_CONFIG_FILE)
}

/// `<base>/submanager/config_dynamic.json`. Pure, no I/O.
pub fn dynamic_config_path_at(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(DYNAMIC_CONFIG_FILE)
}

fn config_base() -> Result<PathBuf, ConfigError> {
    dirs::config_dir().ok_or(ConfigError::DirNotFound { kind: "config" })
}

/// `dirs::state_dir` only exists on Linux; fall back to local data elsewhere.
fn state_base() -> Result<PathBuf, ConfigError> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or(ConfigError::DirNotFound { kind: "state" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_dir_places_both_files_side_by_side() {
        let paths = ConfigPaths::in_dir(Path::new("/etc/sm"));
        assert_eq!(paths.static_path, PathBuf::from("/etc/sm/config.yaml"));
        assert_eq!(paths.dynamic_path, PathBuf::from("/etc/sm/config_dynamic.json"));
    }

    #[test]
    fn overrides_replace_only_given_paths() {
        let paths = ConfigPaths::in_dir(Path::new("/a"))
            .with_overrides(None, Some(PathBuf::from("/b/state.json")));
        assert_eq!(paths.static_path, PathBuf::from("/a/config.yaml"));
        assert_eq!(paths.dynamic_path, PathBuf::from("/b/state.json"));
    }
}
