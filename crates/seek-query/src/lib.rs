//! Free-text query language for seek.
//!
//! - **Terms**: `parse_args` - words that must appear
//! - **Phrases**: `"open file"` - exact token sequences
//! - **Negation**: `-test` - terms that must NOT appear
//! - **OR**: `mutex OR rwlock` - alternatives
//! - **Grouping**: `(a b) OR (c d)` - precedence control
//! - **Fields**: `path:src`, `file:main.rs` - search a specific field
//! - **Boosting**: `config^2.5` - adjust term importance
//! - **Fuzzy**: `recieve~` or `recieve~2` - edit-distance matching
//! - **Wildcards**: `read*`, `fo?` - `*` and `?` inside a term
//! - **Regex**: `/err(or)?_[a-z]+/` - regular expression over indexed terms
//!
//! # Example
//!
//! ```
//! use seek_query::parse;
//!
//! let expr = parse("path:src (mutex OR rwlock) -test").unwrap();
//! assert!(expr.is_some());
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::QueryExpr;
pub use error::{LexError, ParseError, QueryError, QueryErrorKind};
pub use lexer::{Token, tokenize};
pub use parser::parse;
