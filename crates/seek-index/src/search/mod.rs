//! Search execution.
//!
//! A request runs in three phases:
//!
//! 1. **Composition**: the query text is compiled once per requested
//!    sub-query (free text, tag, log) into a [`QueryContext`]. An empty
//!    context answers with no results without touching the index.
//!
//! 2. **Retrieval**: the context's combined query, restricted by the path
//!    filters, runs against one searcher snapshot and yields the total hit
//!    count plus one page of ranked documents.
//!
//! 3. **Matching**: every hit becomes one task on the matching pool. A task
//!    loads the document, runs the [`MatcherChain`] and sends its
//!    [`FileMatches`] back tagged with the hit's rank. Failed tasks are
//!    logged and contribute nothing; the rest are reassembled in rank order.

mod compose;
#[cfg(test)]
mod tests;
mod types;

use std::sync::Arc;

pub use compose::{compose_query, filter_queries};
use crossbeam_channel::unbounded;
use seek_config::{LogSettings, SearchSettings};
use tantivy::{DocAddress, Score, Searcher};
use tracing::{debug, warn};
pub use types::{
    FileMatches, SearchFilter, SearchOptions, SearchRange, SearchRequest, SearchResults,
};

use crate::{
    error::IndexError,
    handle::IndexHandle,
    matcher::{Context, MatcherChain},
    pool::HandoffPool,
    query::QueryContext,
    schema::IndexSchema,
};

/// Runs search requests against an index.
pub struct SearchExecutor {
    /// Matcher factories applied to every hit.
    chain: Arc<MatcherChain>,
    /// Pool running one matching task per hit.
    pool: Arc<HandoffPool>,
    /// Paging and fuzzy defaults.
    search: SearchSettings,
    /// Log query parameters.
    log: LogSettings,
}

impl SearchExecutor {
    /// Creates an executor using the standard matcher chain.
    pub fn new(pool: Arc<HandoffPool>, search: SearchSettings, log: LogSettings) -> Self {
        Self {
            chain: Arc::new(MatcherChain::default()),
            pool,
            search,
            log,
        }
    }

    /// Replaces the matcher chain.
    pub fn with_chain(mut self, chain: MatcherChain) -> Self {
        self.chain = Arc::new(chain);
        self
    }

    /// Runs `request` against the handle's current snapshot.
    pub fn execute(
        &self,
        handle: &IndexHandle,
        request: &SearchRequest,
    ) -> Result<SearchResults, IndexError> {
        let searcher = handle.searcher();
        let schema = handle.schema();

        let query = compose_query(schema, &searcher, request, &self.search, &self.log)?;
        if query.is_empty() {
            debug!(query = %request.query, options = %request.options, "nothing to search");
            return Ok(SearchResults::default());
        }
        let query = Arc::new(query);

        let filters = filter_queries(schema, request.filter.as_ref())?;
        let range = request.range.unwrap_or(SearchRange {
            start: 0,
            max_size: self.search.max_results,
        });
        let (total_hits, hits) =
            query
                .get()
                .filtered(filters)
                .execute(&searcher, range.start, range.max_size)?;
        debug!(total_hits, page = hits.len(), "retrieved");

        let files = self.match_hits(&searcher, schema, &query, hits);
        Ok(SearchResults { total_hits, files })
    }

    /// Matches every hit on the pool and returns the results in rank order.
    fn match_hits(
        &self,
        searcher: &Searcher,
        schema: &IndexSchema,
        query: &Arc<QueryContext>,
        hits: Vec<(Score, DocAddress)>,
    ) -> Vec<FileMatches> {
        let (sender, receiver) = unbounded();
        for (rank, (score, address)) in hits.into_iter().enumerate() {
            let sender = sender.clone();
            let searcher = searcher.clone();
            let schema = schema.clone();
            let query = Arc::clone(query);
            let chain = Arc::clone(&self.chain);
            let task = move || {
                let result = match_document(&searcher, &schema, query, address, score, &chain);
                if sender.send((rank, result)).is_err() {
                    debug!(rank, "search finished before matching task");
                }
            };
            if let Err(e) = self.pool.submit(task) {
                warn!(rank, error = %e, "could not start matching task");
            }
        }
        drop(sender);

        let mut files: Vec<(usize, FileMatches)> = Vec::new();
        for (rank, result) in receiver {
            match result {
                Ok(file) => files.push((rank, file)),
                Err(e) => warn!(rank, error = %e, "dropping document that failed to match"),
            }
        }
        files.sort_by_key(|(rank, _)| *rank);
        files.into_iter().map(|(_, file)| file).collect()
    }
}

/// Loads one hit and computes its line matches.
fn match_document(
    searcher: &Searcher,
    schema: &IndexSchema,
    query: Arc<QueryContext>,
    address: DocAddress,
    score: Score,
    chain: &MatcherChain,
) -> Result<FileMatches, IndexError> {
    let ctx = Context::load(searcher, schema, query, address)?;
    let matches = chain.run(&ctx)?;
    Ok(FileMatches {
        file_id: ctx.file_id().to_string(),
        file_name: ctx.file_name().to_string(),
        file_path: ctx.file_path().to_string(),
        score,
        matches,
    })
}
