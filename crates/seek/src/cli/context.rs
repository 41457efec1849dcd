//! Shared context for running CLI commands.

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
};

use seek_config::{Config, ConfigError};
use seek_index::{CtagsJsonSource, Service};

use super::args::GlobalArgs;

/// Command execution context built once per CLI invocation.
pub struct CommandContext {
    /// Current working directory.
    pub cwd: PathBuf,
    /// Effective configuration.
    pub config: Config,
}

impl CommandContext {
    /// Resolves the configuration from the global flags.
    ///
    /// An explicit `--config` must load. Otherwise the nearest `seek.toml` is
    /// used; with `--index-dir` a missing file falls back to defaults.
    pub fn load(args: &GlobalArgs) -> Result<Self, ExitCode> {
        let cwd = current_dir_or_failure()?;
        let mut config = match (&args.config, &args.index_dir) {
            (Some(path), _) => Config::load(path),
            (None, Some(index_dir)) => match Config::discover(&cwd) {
                Err(ConfigError::NotFound { .. }) => Ok(Config::with_index_dir(index_dir.clone())),
                other => other,
            },
            (None, None) => Config::discover(&cwd),
        }
        .map_err(|e| {
            eprintln!("error: failed to load configuration: {e}");
            ExitCode::FAILURE
        })?;

        if let Some(index_dir) = &args.index_dir {
            config.index_dir = absolute(&cwd, index_dir);
        }
        Ok(Self { cwd, config })
    }

    /// Opens the service, reading tags from ctags sidecar files.
    pub fn service(&self) -> Result<Service, ExitCode> {
        Service::open(self.config.clone())
            .map(|service| service.with_tag_source(CtagsJsonSource))
            .map_err(|e| {
                eprintln!("error: failed to open index: {e}");
                ExitCode::FAILURE
            })
    }
}

/// Returns the current working directory or exits with a consistent error.
fn current_dir_or_failure() -> Result<PathBuf, ExitCode> {
    env::current_dir().map_err(|e| {
        eprintln!("error: could not determine current directory: {e}");
        ExitCode::FAILURE
    })
}

/// Resolves `path` against `cwd`.
fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
