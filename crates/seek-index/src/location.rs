//! Line and column positions within a document.
//!
//! [`LineInformations`] is built once per document by a single forward scan and
//! converts between byte offsets and [`Location`]s. Columns are 1-based byte
//! columns; both ends of a location are inclusive.

use std::{
    fmt,
    io::{self, BufRead},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid combination of line and column values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// Lines are 1-based.
    #[error("line must be at least 1")]
    ZeroLine,
    /// Columns are 1-based.
    #[error("start column must be at least 1")]
    ZeroColumn,
    /// The span runs backwards.
    #[error("end column {end} precedes start column {start}")]
    Reversed {
        /// Start column.
        start: usize,
        /// End column.
        end: usize,
    },
}

/// Failures of line lookups.
#[derive(Debug, Error)]
pub enum LineError {
    /// Reading the source failed or it was not valid UTF-8.
    #[error("malformed input: {0}")]
    Malformed(#[from] io::Error),
    /// A 1-based line number outside `[1, line_count]`.
    #[error("line {line} out of range (document has {count} lines)")]
    OutOfRange {
        /// Requested line.
        line: usize,
        /// Number of lines in the document.
        count: usize,
    },
}

/// A single-line span: `line`, `start_column..=end_column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// 1-based line number.
    line: usize,
    /// 1-based first column.
    start_column: usize,
    /// 1-based last column, inclusive.
    end_column: usize,
}

impl Location {
    /// Creates a location, rejecting zero lines or columns and reversed spans.
    pub fn new(line: usize, start_column: usize, end_column: usize) -> Result<Self, LocationError> {
        if line == 0 {
            return Err(LocationError::ZeroLine);
        }
        if start_column == 0 {
            return Err(LocationError::ZeroColumn);
        }
        if end_column < start_column {
            return Err(LocationError::Reversed {
                start: start_column,
                end: end_column,
            });
        }
        Ok(Self {
            line,
            start_column,
            end_column,
        })
    }

    /// 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based first column.
    pub fn start_column(&self) -> usize {
        self.start_column
    }

    /// 1-based last column, inclusive.
    pub fn end_column(&self) -> usize {
        self.end_column
    }

    /// True iff `other` is on the same line and its columns cover this span.
    pub fn is_inside(&self, other: &Self) -> bool {
        self.line == other.line
            && other.start_column <= self.start_column
            && self.end_column <= other.end_column
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.line, self.start_column, self.end_column)
    }
}

/// Per-document line table.
#[derive(Debug, Clone)]
pub struct LineInformations {
    /// Line text without the terminating newline (or carriage return).
    lines: Vec<String>,
    /// Byte offset at which each line starts; strictly increasing.
    starts: Vec<usize>,
}

impl LineInformations {
    /// Scans `content` once, recording every line and its start offset.
    ///
    /// A trailing newline does not open a new line; empty content has a single
    /// empty line.
    pub fn from_content(content: &str) -> Self {
        let mut lines = Vec::new();
        let mut starts = Vec::new();
        let mut start = 0;

        for (offset, byte) in content.bytes().enumerate() {
            if byte == b'\n' {
                lines.push(strip_cr(&content[start..offset]).to_string());
                starts.push(start);
                start = offset + 1;
            }
        }

        if start < content.len() || lines.is_empty() {
            lines.push(strip_cr(&content[start..]).to_string());
            starts.push(start);
        }

        Self { lines, starts }
    }

    /// Reads the whole source and scans it.
    pub fn from_reader(mut reader: impl BufRead) -> Result<Self, LineError> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Ok(Self::from_content(&content))
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of the 1-based line `line`.
    pub fn line_content(&self, line: usize) -> Result<&str, LineError> {
        let idx = self.index(line)?;
        Ok(&self.lines[idx])
    }

    /// Byte offset at which the 1-based line `line` starts.
    pub fn line_start_offset(&self, line: usize) -> Result<usize, LineError> {
        let idx = self.index(line)?;
        Ok(self.starts[idx])
    }

    /// The line whose start is the greatest start at or before `offset`.
    ///
    /// Offsets past the last line start clamp to the last line.
    pub fn line_for_offset(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset).max(1)
    }

    /// Converts a byte span into a location on the line containing `start`.
    ///
    /// A zero length is treated as one byte. The span is not checked to stay on
    /// a single line.
    pub fn offset_to_location(&self, start: usize, length: usize) -> Location {
        let line = self.line_for_offset(start);
        let line_start = self.starts[line - 1];
        let start_column = start - line_start + 1;
        Location {
            line,
            start_column,
            end_column: start_column + length.max(1) - 1,
        }
    }

    /// Byte offset of a location's first column.
    pub fn location_to_start_offset(&self, location: &Location) -> Result<usize, LineError> {
        Ok(self.line_start_offset(location.line)? + location.start_column - 1)
    }

    /// Validates a 1-based line number and returns its index.
    fn index(&self, line: usize) -> Result<usize, LineError> {
        if line == 0 || line > self.lines.len() {
            return Err(LineError::OutOfRange {
                line,
                count: self.lines.len(),
            });
        }
        Ok(line - 1)
    }
}

/// Drops one trailing carriage return.
fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
