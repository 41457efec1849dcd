//! Query composition.
//!
//! A search request carries up to three independent sub-queries: free text,
//! tag search and log-line search. Each is compiled separately and added to a
//! [`QueryContext`] together with the auxiliary data its result matcher needs.
//! The context ORs the sub-queries into one [`RetrievalQuery`].

mod compile;
mod expand;
mod log;
mod tag;

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

pub use compile::compile_text_query;
pub use expand::{LevenshteinDfa, expand_terms};
pub use log::{LogMatchCollector, SWAP_PENALTY, Span, build_log_query};
pub use tag::{TagQuery, build_tag_query, parse_tag_query, strip_kind_clauses};
use tantivy::{
    DocAddress, DocId, Score, Searcher, SegmentReader,
    collector::{Count, TopDocs},
    query::{BooleanQuery, Occur, Query},
};
use thiserror::Error;

use crate::{document::DEFAULT_BOOST, error::IndexError, schema::fields};

/// Kind of sub-query in a [`QueryContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryType {
    /// Free-text search over file content.
    Text,
    /// Tag (definition) search.
    Tag,
    /// Fuzzy log-line search.
    Log,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Tag => "tag",
            Self::Log => "log",
        };
        f.write_str(name)
    }
}

/// Errors raised while composing a [`QueryContext`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryContextError {
    /// A sub-query of this type was already added.
    #[error("a {0} query was already added to this request")]
    DuplicateQueryType(QueryType),
}

/// Auxiliary per-type data consumed by the result matchers.
#[derive(Debug, Clone)]
pub enum QueryData {
    /// Index terms matched by the free-text query, after expansion.
    Text {
        /// Lowercased index terms to highlight.
        terms: HashSet<String>,
    },
    /// Parsed tag query.
    Tag(TagQuery),
    /// Spans recorded while the log query was scored.
    Log(LogMatchCollector),
}

/// The sub-queries of one search request.
#[derive(Debug, Default)]
pub struct QueryContext {
    /// Sub-queries by type.
    queries: BTreeMap<QueryType, Box<dyn Query>>,
    /// Matcher data by type.
    data: BTreeMap<QueryType, QueryData>,
    /// Drop matches contained in another match of the same document.
    filter_overlapping: bool,
}

impl QueryContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sub-query; each type may be added once.
    pub fn add(
        &mut self,
        query_type: QueryType,
        query: Box<dyn Query>,
        data: Option<QueryData>,
    ) -> Result<(), QueryContextError> {
        if self.queries.contains_key(&query_type) {
            return Err(QueryContextError::DuplicateQueryType(query_type));
        }
        self.queries.insert(query_type, query);
        if let Some(data) = data {
            self.data.insert(query_type, data);
        }
        Ok(())
    }

    /// The query that retrieves candidate documents.
    ///
    /// Log queries score by span quality, so the per-file boost is only
    /// applied when no log sub-query is present.
    pub fn get(&self) -> RetrievalQuery {
        let mut queries: Vec<Box<dyn Query>> =
            self.queries.values().map(|q| q.box_clone()).collect();
        let combined: Box<dyn Query> = if queries.len() == 1 {
            queries.remove(0)
        } else {
            Box::new(BooleanQuery::new(
                queries.into_iter().map(|q| (Occur::Should, q)).collect(),
            ))
        };

        if self.queries.contains_key(&QueryType::Log) {
            RetrievalQuery::Raw(combined)
        } else {
            RetrievalQuery::Boosted(combined)
        }
    }

    /// The sub-query of `query_type`, if added.
    pub fn get_query(&self, query_type: QueryType) -> Option<&dyn Query> {
        self.queries.get(&query_type).map(|q| &**q)
    }

    /// Matcher data of `query_type`, if any.
    pub fn data(&self, query_type: QueryType) -> Option<&QueryData> {
        self.data.get(&query_type)
    }

    /// True if no sub-query was added.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Enables or disables overlap filtering of line matches.
    pub fn set_filter_overlapping(&mut self, enabled: bool) {
        self.filter_overlapping = enabled;
    }

    /// Whether line matches are overlap-filtered.
    pub fn filter_overlapping(&self) -> bool {
        self.filter_overlapping
    }
}

/// A composed query ready for execution.
#[derive(Debug)]
pub enum RetrievalQuery {
    /// Scores are used as produced by the query.
    Raw(Box<dyn Query>),
    /// Scores are multiplied by each document's `boost` field.
    Boosted(Box<dyn Query>),
}

impl RetrievalQuery {
    /// The wrapped query.
    pub fn query(&self) -> &dyn Query {
        match self {
            Self::Raw(q) | Self::Boosted(q) => &**q,
        }
    }

    /// Restricts matches to documents also matching every filter.
    pub fn filtered(self, filters: Vec<Box<dyn Query>>) -> Self {
        if filters.is_empty() {
            return self;
        }
        let wrap = |inner: Box<dyn Query>| -> Box<dyn Query> {
            let mut clauses = vec![(Occur::Must, inner)];
            clauses.extend(filters.into_iter().map(|f| (Occur::Must, f)));
            Box::new(BooleanQuery::new(clauses))
        };
        match self {
            Self::Raw(q) => Self::Raw(wrap(q)),
            Self::Boosted(q) => Self::Boosted(wrap(q)),
        }
    }

    /// Runs the query and returns the total hit count and one page of hits.
    pub fn execute(
        &self,
        searcher: &Searcher,
        offset: usize,
        limit: usize,
    ) -> Result<(usize, Vec<(Score, DocAddress)>), IndexError> {
        if limit == 0 {
            let total = searcher
                .search(self.query(), &Count)
                .map_err(|e| IndexError::read(&e))?;
            return Ok((total, Vec::new()));
        }

        let top = TopDocs::with_limit(limit).and_offset(offset);
        match self {
            Self::Raw(query) => searcher
                .search(&**query, &(Count, top))
                .map_err(|e| IndexError::read(&e)),
            Self::Boosted(query) => {
                let boosted = top.tweak_score(|segment_reader: &SegmentReader| {
                    let column = segment_reader.fast_fields().f64(fields::BOOST).ok();
                    move |doc: DocId, score: Score| {
                        let boost = column
                            .as_ref()
                            .and_then(|c| c.first(doc))
                            .unwrap_or(DEFAULT_BOOST);
                        score * boost as Score
                    }
                });
                searcher
                    .search(&**query, &(Count, boosted))
                    .map_err(|e| IndexError::read(&e))
            }
        }
    }
}
