//! Configuration file parsing.
//!
//! Parses a `seek.toml` file into an intermediate `RawConfig` that keeps every
//! field optional, so defaults and validation can be applied in one place.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::ConfigError;

/// Raw configuration as parsed directly from a TOML file.
///
/// Mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    /// Directory holding the index and the suggestion databases.
    pub index_dir: Option<String>,
    /// Search settings section.
    pub search: Option<RawSearchSettings>,
    /// Log search settings section.
    pub log: Option<RawLogSettings>,
    /// Suggestion settings section.
    pub suggest: Option<RawSuggestSettings>,
    /// Worker pool settings section.
    pub pool: Option<RawPoolSettings>,
}

/// Raw search settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawSearchSettings {
    /// Page size used when a request carries no range.
    pub max_results: Option<usize>,
    /// Edit distance used for `term~` queries without an explicit distance.
    pub fuzzy_distance: Option<u8>,
    /// Memory budget for the index writer, in bytes.
    pub writer_heap_bytes: Option<usize>,
}

/// Raw log search settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawLogSettings {
    /// Minimum number of distinct query terms for a log search to run.
    pub min_terms: Option<usize>,
    /// Maximum number of non-query tokens between two hits of one span.
    pub max_gap: Option<usize>,
    /// Spans scoring more than this below the best span are dropped.
    pub max_score_diff: Option<f32>,
}

/// Raw suggestion settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawSuggestSettings {
    /// Edit distance for filename lookups.
    pub fuzzy_distance: Option<u8>,
    /// Number of suggestions returned when the caller passes no limit.
    pub default_limit: Option<usize>,
}

/// Raw worker pool settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawPoolSettings {
    /// Seconds an idle worker waits for work before exiting.
    pub keep_alive_secs: Option<u64>,
}

/// Parses a configuration file from disk.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}
