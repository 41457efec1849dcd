//! Query errors.
//!
//! The lexer reports a byte position into the query text; the parser reports
//! a token index, which is not mapped back to bytes. Compile errors come from
//! the index crate once a parsed expression is lowered to index queries.
//! Rendering a [`QueryError`] prints the query with a caret under the
//! offending byte when the position is known, followed by a hint for common
//! mistakes.

use std::fmt;

use thiserror::Error;

/// Tokenization failure at a byte position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (at byte {position})")]
pub struct LexError {
    /// What went wrong.
    pub message: String,
    /// Byte offset into `input`.
    pub position: usize,
    /// The query text being tokenized.
    pub input: String,
}

impl LexError {
    /// Creates a lexer error for `input`.
    pub fn new(message: impl Into<String>, position: usize, input: &str) -> Self {
        Self {
            message: message.into(),
            position,
            input: input.to_owned(),
        }
    }
}

/// Syntax error found by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Index of the offending token, if any.
    pub token_index: Option<usize>,
}

impl ParseError {
    /// Creates a parse error.
    pub fn new(message: impl Into<String>, token_index: Option<usize>) -> Self {
        Self {
            message: message.into(),
            token_index,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_index {
            Some(index) => write!(f, "{} (token {index})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self::new(err.message, None)
    }
}

/// Stage at which a query was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The text could not be tokenized.
    Lex {
        /// What went wrong.
        message: String,
        /// Byte offset into the query.
        position: usize,
    },
    /// The tokens do not form a valid expression.
    Parse {
        /// What went wrong.
        message: String,
        /// Byte offset into the query, when known.
        position: Option<usize>,
    },
    /// The expression is valid but cannot be run against the index.
    Compile {
        /// What went wrong.
        message: String,
    },
}

/// Hints keyed by stage and a fragment of the error message.
const HINTS: &[(Stage, &str, &str)] = &[
    (Stage::Lex, "unclosed quote", "Add a closing quote (\") to complete the phrase"),
    (
        Stage::Lex,
        "regular expression",
        "Close the pattern with '/', or escape a literal slash as '\\/'",
    ),
    (Stage::Lex, "edit distance", "Fuzzy distances are small integers, e.g. 'recieve~2'"),
    (Stage::Parse, "closing parenthesis", "Balance every '(' with a ')'"),
    (Stage::Parse, "OR", "OR needs an expression on both sides, e.g. 'mutex OR rwlock'"),
    (Stage::Compile, "unknown field", "Valid fields are: path, file, content, labels"),
    (
        Stage::Compile,
        "invalid regex",
        "Regex syntax follows the regex crate, matched against whole terms",
    ),
];

/// Stage discriminant used by the hint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Tokenization.
    Lex,
    /// Parsing.
    Parse,
    /// Lowering to index queries.
    Compile,
}

/// A rejected query, with the query text when available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct QueryError {
    /// Stage and details.
    pub kind: QueryErrorKind,
    /// The query text.
    pub query: Option<String>,
}

impl QueryError {
    /// Lexer error at `position` in `query`.
    pub fn lex(message: impl Into<String>, position: usize, query: impl Into<String>) -> Self {
        Self {
            kind: QueryErrorKind::Lex {
                message: message.into(),
                position,
            },
            query: Some(query.into()),
        }
    }

    /// Parser error.
    pub fn parse(message: impl Into<String>, position: Option<usize>, query: Option<String>) -> Self {
        Self {
            kind: QueryErrorKind::Parse {
                message: message.into(),
                position,
            },
            query,
        }
    }

    /// Compile error.
    pub fn compile(message: impl Into<String>) -> Self {
        Self {
            kind: QueryErrorKind::Compile {
                message: message.into(),
            },
            query: None,
        }
    }

    /// Attaches the query text.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// The bare message.
    pub fn message(&self) -> &str {
        match &self.kind {
            QueryErrorKind::Lex { message, .. }
            | QueryErrorKind::Parse { message, .. }
            | QueryErrorKind::Compile { message } => message,
        }
    }

    /// Byte offset of the problem, when known.
    pub fn position(&self) -> Option<usize> {
        match &self.kind {
            QueryErrorKind::Lex { position, .. } => Some(*position),
            QueryErrorKind::Parse { position, .. } => *position,
            QueryErrorKind::Compile { .. } => None,
        }
    }

    /// A hint for common mistakes.
    pub fn suggestion(&self) -> Option<&'static str> {
        let stage = self.stage();
        let message = self.message();
        HINTS
            .iter()
            .find(|(s, needle, _)| *s == stage && message.contains(needle))
            .map(|(_, _, hint)| *hint)
    }

    /// Stage of this error.
    fn stage(&self) -> Stage {
        match self.kind {
            QueryErrorKind::Lex { .. } => Stage::Lex,
            QueryErrorKind::Parse { .. } => Stage::Parse,
            QueryErrorKind::Compile { .. } => Stage::Compile,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.stage() {
            Stage::Lex | Stage::Parse => "query syntax error",
            Stage::Compile => "query error",
        };
        writeln!(f, "{label}: {}", self.message())?;

        if let Some(query) = &self.query {
            writeln!(f, "  {query}")?;
            if let Some(position) = self.position() {
                writeln!(f, "  {}", caret(query, position))?;
            }
        }

        match self.suggestion() {
            Some(hint) => write!(f, "hint: {hint}"),
            None => Ok(()),
        }
    }
}

/// A caret under byte `position` of `query`, clamped to its end.
fn caret(query: &str, position: usize) -> String {
    let column = query
        .char_indices()
        .take_while(|(offset, _)| *offset < position)
        .count();
    format!("{}^", " ".repeat(column))
}

impl From<LexError> for QueryError {
    fn from(err: LexError) -> Self {
        Self::lex(err.message, err.position, err.input)
    }
}

impl From<ParseError> for QueryError {
    fn from(err: ParseError) -> Self {
        Self::parse(err.message, None, None)
    }
}
