//! Configuration file discovery.
//!
//! Finds the `seek.toml` that applies to a working directory by walking up the
//! directory tree, falling back to the per-user config directory.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = "seek.toml";

/// Application directory name under the platform config directory.
const APP_DIR: &str = "seek";

/// Finds the configuration file for `cwd`.
///
/// The closest `seek.toml` at or above `cwd` wins; if there is none the global
/// `<config_dir>/seek/seek.toml` is used when it exists.
pub fn discover_config_file(cwd: &Path) -> Option<PathBuf> {
    let mut current = Some(cwd);
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }

    global_config_path().filter(|path| path.is_file())
}

/// Returns the path of the per-user configuration file.
///
/// Returns `None` if the home directory cannot be determined.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join(APP_DIR).join(CONFIG_FILENAME))
}
