//! Indexing, search and suggestions for seek.
//!
//! Source files are stored in a Tantivy index together with their tags (the
//! symbols a tag generator found in them). A search request is composed into
//! up to three sub-queries: free text over the content, a tag query over
//! symbol kinds and texts, and a log query that looks for the message of a
//! log line. Matching documents are then scanned by a matcher that reports
//! the exact line and column ranges of each hit.
//!
//! Two suggestion databases are derived from the index on demand: a file
//! name automaton with fuzzy prefix lookup and a small symbol index with
//! infix lookup.
//!
//! [`Service`] ties everything together:
//!
//! ```no_run
//! use seek_config::Config;
//! use seek_index::{SearchOptions, SearchRequest, Service};
//!
//! let service = Service::open(Config::with_index_dir("./index".into())).unwrap();
//! let results = service
//!     .search(&SearchRequest::new("kind:function main", SearchOptions::SEARCH_IN_DEFS))
//!     .unwrap();
//! for file in results.files {
//!     println!("{} ({} matches)", file.file_path, file.matches.len());
//! }
//! ```

mod analyzer;
mod document;
mod error;
mod handle;
mod location;
mod matcher;
mod pool;
mod query;
mod schema;
mod search;
mod service;
mod suggest;
mod tag_source;
mod tags;

pub use analyzer::{
    PATH_TOKENIZER, SOURCE_TOKENIZER, SourceToken, TAG_KIND_TOKENIZER, register_tokenizers,
    source_tokens,
};
pub use document::{DEFAULT_BOOST, FileDocument};
pub use error::IndexError;
pub use handle::IndexHandle;
pub use location::{LineError, LineInformations, Location, LocationError};
pub use matcher::{
    Context, HighlightMatcherFactory, LineMatch, LogMatcherFactory, MatcherChain, MatcherFactory,
    ResultMatcher, TagKindMatcherFactory,
};
pub use pool::HandoffPool;
pub use query::{
    LogMatchCollector, QueryContext, QueryContextError, QueryData, QueryType, SWAP_PENALTY, Span,
    TagQuery,
};
pub use schema::{IndexSchema, fields};
pub use search::{
    FileMatches, SearchExecutor, SearchFilter, SearchOptions, SearchRange, SearchRequest,
    SearchResults,
};
pub use service::{
    IndexFileRequest, PATCHABLE_FIELDS, Request, Response, Service, Statistics,
};
pub use suggest::{
    BuildReport, DatabaseBuilder, FileNameDatabase, SuggestError, SuggestInput,
    SuggestionDatabase, SuggestionHandler, SymbolDatabase,
};
pub use tag_source::{CtagsJsonSource, NoTags, TagSource, ctags_kind};
pub use tags::{GenericKind, Tag, Tags, TagsError};
