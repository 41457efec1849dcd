//! Error types for seek configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use toml::de;

/// Errors that can occur when loading or validating configuration.
///
/// All of these are fatal at service startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseToml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: de::Error,
    },

    /// A required setting is absent.
    #[error("missing required setting: {field}")]
    MissingField {
        /// Dotted name of the missing setting.
        field: &'static str,
    },

    /// A setting has a value outside its permitted range.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Dotted name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// No configuration file could be located.
    #[error("no {name} found in {start} or any parent directory")]
    NotFound {
        /// File name that was searched for.
        name: &'static str,
        /// Directory the search started from.
        start: PathBuf,
    },
}
