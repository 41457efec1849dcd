//! Data structures exchanged by search.

use std::{fmt, ops::BitOr};

use serde::{Deserialize, Serialize};

use crate::matcher::LineMatch;

/// Which sub-queries a search request runs, as bit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchOptions(u8);

impl SearchOptions {
    /// Free text over file content.
    pub const SEARCH_IN_SOURCE: Self = Self(1);
    /// Tag (definition) search.
    pub const SEARCH_IN_DEFS: Self = Self(2);
    /// Fuzzy log-line search.
    pub const FIND_LOG_TEXT: Self = Self(4);
    /// Free text over file names instead of content.
    pub const SEARCH_FOR_FILE_NAME: Self = Self(8);

    /// Options from raw bits; unknown bits are kept and ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every flag of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no known flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 & 0x0f == 0
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::SEARCH_IN_SOURCE
    }
}

impl BitOr for SearchOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::SEARCH_IN_SOURCE, "source"),
            (Self::SEARCH_IN_DEFS, "defs"),
            (Self::FIND_LOG_TEXT, "log"),
            (Self::SEARCH_FOR_FILE_NAME, "file_name"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Restricts a search to files whose directory or name match a regex.
///
/// Patterns must match the whole stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Pattern for the directory part of the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir_regex: Option<String>,
    /// Pattern for the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_regex: Option<String>,
}

/// One page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRange {
    /// Rank of the first file returned.
    pub start: usize,
    /// Maximum number of files returned.
    pub max_size: usize,
}

/// A search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text, interpreted per option.
    pub query: String,
    /// Sub-queries to run.
    #[serde(default)]
    pub options: SearchOptions,
    /// Optional path filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchFilter>,
    /// Optional page; defaults to the first `max_results` files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SearchRange>,
}

impl SearchRequest {
    /// A request with no filter and the default page.
    pub fn new(query: impl Into<String>, options: SearchOptions) -> Self {
        Self {
            query: query.into(),
            options,
            filter: None,
            range: None,
        }
    }
}

/// Matches inside one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMatches {
    /// Caller-assigned file id.
    pub file_id: String,
    /// Final path component.
    pub file_name: String,
    /// Full path.
    pub file_path: String,
    /// Retrieval score.
    pub score: f32,
    /// Line matches in result order.
    pub matches: Vec<LineMatch>,
}

/// Result of a search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Number of files matching the retrieval query, before paging.
    pub total_hits: usize,
    /// Files of the requested page in rank order.
    pub files: Vec<FileMatches>,
}
