//! Matches from spans recorded by a log query.

use super::{Context, LineMatch, MatcherFactory, ResultMatcher};
use crate::{
    error::IndexError,
    query::{LogMatchCollector, QueryData, QueryType},
};

/// Applies when the request carries log spans.
pub struct LogMatcherFactory;

impl MatcherFactory for LogMatcherFactory {
    fn create(&self, ctx: &Context) -> Option<ResultMatcher> {
        match ctx.query.data(QueryType::Log) {
            Some(QueryData::Log(collector)) => Some(ResultMatcher::Log(LogMatcher {
                collector: collector.clone(),
            })),
            _ => None,
        }
    }
}

/// Emits one match per recorded span, best first.
#[derive(Debug)]
pub struct LogMatcher {
    /// Spans recorded while the query was scored.
    collector: LogMatchCollector,
}

impl LogMatcher {
    /// Matches of the context's document.
    pub fn matches(&self, ctx: &Context) -> Result<Vec<LineMatch>, IndexError> {
        let mut spans = self.collector.spans_for(ctx.segment_id, ctx.address.doc_id);
        spans.sort_by(|a, b| b.score.total_cmp(&a.score));
        spans
            .into_iter()
            .map(|span| LineMatch::at(ctx, span.start, span.end))
            .collect()
    }
}
