//! Configuration system for seek.
//!
//! seek reads a single TOML file, `seek.toml`. Every section is optional and
//! falls back to built-in defaults; only `index_dir` is required. A relative
//! `index_dir` is resolved against the directory containing the config file.
//!
//! ```toml
//! index_dir = "/var/lib/seek"
//!
//! [log]
//! min_terms = 2
//! max_score_diff = 0.5
//! ```

#![warn(missing_docs)]

mod discovery;
mod error;
mod parse;
mod validate;

use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_FILENAME, discover_config_file, global_config_path};
pub use error::ConfigError;
pub use parse::{
    RawConfig, RawLogSettings, RawPoolSettings, RawSearchSettings, RawSuggestSettings,
    parse_config_file, parse_config_str,
};
use serde::Serialize;
pub use validate::validate_config;

/// Fully resolved service configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the index; suggestion databases live in `suggest/` below it.
    pub index_dir: PathBuf,
    /// Search settings.
    pub search: SearchSettings,
    /// Log search settings.
    pub log: LogSettings,
    /// Suggestion settings.
    pub suggest: SuggestSettings,
    /// Worker pool settings.
    pub pool: PoolSettings,
    /// File this configuration was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Creates a configuration with default settings for the given index directory.
    pub fn with_index_dir(index_dir: PathBuf) -> Self {
        Self {
            index_dir,
            search: SearchSettings::default(),
            log: LogSettings::default(),
            suggest: SuggestSettings::default(),
            pool: PoolSettings::default(),
            source: None,
        }
    }

    /// Loads, resolves and validates the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = parse_config_file(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut config = Self::from_raw(raw, base)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Discovers the configuration file for `cwd` and loads it.
    pub fn discover(cwd: &Path) -> Result<Self, ConfigError> {
        let path = discover_config_file(cwd).ok_or_else(|| ConfigError::NotFound {
            name: CONFIG_FILENAME,
            start: cwd.to_path_buf(),
        })?;
        Self::load(&path)
    }

    /// Applies defaults to a raw configuration and validates the result.
    ///
    /// `base` is the directory relative `index_dir` values are resolved against.
    pub fn from_raw(raw: RawConfig, base: &Path) -> Result<Self, ConfigError> {
        let index_dir = raw
            .index_dir
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingField { field: "index_dir" })?;
        let index_dir = if index_dir.is_absolute() {
            index_dir
        } else {
            base.join(index_dir)
        };

        let mut config = Self::with_index_dir(index_dir);

        if let Some(search) = raw.search {
            let defaults = &mut config.search;
            defaults.max_results = search.max_results.unwrap_or(defaults.max_results);
            defaults.fuzzy_distance = search.fuzzy_distance.unwrap_or(defaults.fuzzy_distance);
            defaults.writer_heap_bytes = search
                .writer_heap_bytes
                .unwrap_or(defaults.writer_heap_bytes);
        }

        if let Some(log) = raw.log {
            let defaults = &mut config.log;
            defaults.min_terms = log.min_terms.unwrap_or(defaults.min_terms);
            defaults.max_gap = log.max_gap.unwrap_or(defaults.max_gap);
            defaults.max_score_diff = log.max_score_diff.or(defaults.max_score_diff);
        }

        if let Some(suggest) = raw.suggest {
            let defaults = &mut config.suggest;
            defaults.fuzzy_distance = suggest.fuzzy_distance.unwrap_or(defaults.fuzzy_distance);
            defaults.default_limit = suggest.default_limit.unwrap_or(defaults.default_limit);
        }

        if let Some(pool) = raw.pool {
            config.pool.keep_alive_secs = pool.keep_alive_secs.unwrap_or(config.pool.keep_alive_secs);
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Directory that holds both suggestion databases.
    pub fn suggest_dir(&self) -> PathBuf {
        self.index_dir.join("suggest")
    }

    /// Serializes the effective settings to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Search-related settings.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSettings {
    /// Page size used when a request carries no range.
    pub max_results: usize,
    /// Edit distance for `term~` queries without an explicit distance.
    pub fuzzy_distance: u8,
    /// Memory budget for the index writer, in bytes.
    pub writer_heap_bytes: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 25,
            fuzzy_distance: 1,
            writer_heap_bytes: 50_000_000,
        }
    }
}

/// Settings for log-line fuzzy search.
#[derive(Debug, Clone, Serialize)]
pub struct LogSettings {
    /// Queries with fewer distinct terms never match.
    pub min_terms: usize,
    /// Maximum number of non-query tokens tolerated between two hits of one span.
    pub max_gap: usize,
    /// When set, spans scoring more than this below a document's best span are dropped.
    pub max_score_diff: Option<f32>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            min_terms: 2,
            max_gap: 3,
            max_score_diff: None,
        }
    }
}

/// Settings for the suggestion subsystem.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestSettings {
    /// Edit distance used by the filename database.
    pub fuzzy_distance: u8,
    /// Number of suggestions returned when the caller passes no limit.
    pub default_limit: usize,
}

impl Default for SuggestSettings {
    fn default() -> Self {
        Self {
            fuzzy_distance: 1,
            default_limit: 10,
        }
    }
}

/// Settings for the matching and indexing worker pools.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSettings {
    /// Seconds an idle worker waits for a hand-off before exiting.
    pub keep_alive_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { keep_alive_secs: 60 }
    }
}
