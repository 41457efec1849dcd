//! Configuration validation.
//!
//! Checks value ranges after defaults have been applied. Any failure here
//! aborts service startup.

use crate::{Config, ConfigError};

/// Largest edit distance the Levenshtein automata support.
const MAX_FUZZY_DISTANCE: u8 = 4;

/// Smallest writer heap tantivy accepts.
const MIN_WRITER_HEAP: usize = 15_000_000;

/// Validates a resolved configuration.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.index_dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField { field: "index_dir" });
    }

    if config.search.max_results == 0 {
        return Err(invalid("search.max_results", "must be at least 1"));
    }

    if config.search.fuzzy_distance > MAX_FUZZY_DISTANCE {
        return Err(invalid(
            "search.fuzzy_distance",
            format!("must be at most {MAX_FUZZY_DISTANCE}"),
        ));
    }

    if config.search.writer_heap_bytes < MIN_WRITER_HEAP {
        return Err(invalid(
            "search.writer_heap_bytes",
            format!("must be at least {MIN_WRITER_HEAP}"),
        ));
    }

    if config.log.min_terms == 0 {
        return Err(invalid("log.min_terms", "must be at least 1"));
    }

    if let Some(diff) = config.log.max_score_diff
        && !(diff.is_finite() && diff >= 0.0)
    {
        return Err(invalid(
            "log.max_score_diff",
            format!("must be a non-negative number, got {diff}"),
        ));
    }

    if config.suggest.fuzzy_distance > MAX_FUZZY_DISTANCE {
        return Err(invalid(
            "suggest.fuzzy_distance",
            format!("must be at most {MAX_FUZZY_DISTANCE}"),
        ));
    }

    Ok(())
}

/// Builds an `InvalidValue` error.
fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: message.into(),
    }
}
