//! Error types for the seek-index crate.

use std::{io, path::PathBuf};

use seek_query::QueryError;
use thiserror::Error;

use crate::{location::LineError, query::QueryContextError, suggest::SuggestError, tags::TagsError};

/// Errors that can occur when working with the search index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Failed to open or create the index.
    #[error("failed to open index at {path}: {message}")]
    OpenIndex {
        /// Path to the index directory.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to write to the index.
    #[error("failed to write to index: {0}")]
    Write(String),

    /// Failed to commit changes to the index.
    #[error("failed to commit index: {0}")]
    Commit(String),

    /// Failed to read from the index.
    #[error("failed to read index: {0}")]
    Read(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed query text.
    #[error("{0}")]
    Query(#[from] QueryError),

    /// Invalid query composition.
    #[error(transparent)]
    QueryContext(#[from] QueryContextError),

    /// A document's tags blob could not be decoded or encoded.
    #[error("tags: {0}")]
    Tags(#[from] TagsError),

    /// Offset or line lookup failed.
    #[error(transparent)]
    Line(#[from] LineError),

    /// Suggestion database failure.
    #[error(transparent)]
    Suggest(#[from] SuggestError),

    /// No document is indexed under the given file id.
    #[error("no document with file id {0}")]
    NotFound(String),

    /// The field cannot be patched through `add_field_values`.
    #[error("field {0} cannot be patched")]
    UnpatchableField(String),

    /// A patched field value could not be parsed.
    #[error("invalid value {value:?} for field {field}")]
    InvalidFieldValue {
        /// Field name.
        field: String,
        /// Offending value.
        value: String,
    },
}

impl IndexError {
    /// Creates an `OpenIndex` error from a path and Tantivy error.
    pub(crate) fn open_index(path: PathBuf, source: &tantivy::TantivyError) -> Self {
        Self::OpenIndex {
            path,
            message: source.to_string(),
        }
    }

    /// Creates a `Write` error from a Tantivy error.
    pub(crate) fn write(source: &tantivy::TantivyError) -> Self {
        Self::Write(source.to_string())
    }

    /// Creates a `Commit` error from a Tantivy error.
    pub(crate) fn commit(source: &tantivy::TantivyError) -> Self {
        Self::Commit(source.to_string())
    }

    /// Creates a `Read` error from a Tantivy error.
    pub(crate) fn read(source: &tantivy::TantivyError) -> Self {
        Self::Read(source.to_string())
    }

    /// Returns true for errors caused by the shape of a request rather than the index.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::Query(_)
                | Self::QueryContext(_)
                | Self::NotFound(_)
                | Self::UnpatchableField(_)
                | Self::InvalidFieldValue { .. }
        )
    }
}
