//! Default matcher: every occurrence of a matched query term.

use super::{Context, LineMatch, MatcherFactory, ResultMatcher};
use crate::{
    analyzer::source_tokens,
    error::IndexError,
    query::{QueryData, QueryType},
};

/// Always applies; used when no more specific matcher does.
pub struct HighlightMatcherFactory;

impl MatcherFactory for HighlightMatcherFactory {
    fn create(&self, _ctx: &Context) -> Option<ResultMatcher> {
        Some(ResultMatcher::Highlight(HighlightMatcher))
    }
}

/// Highlights content tokens that are among the free-text query's terms.
#[derive(Debug)]
pub struct HighlightMatcher;

impl HighlightMatcher {
    /// Matches of the context's document, in content order.
    pub fn matches(&self, ctx: &Context) -> Result<Vec<LineMatch>, IndexError> {
        let Some(QueryData::Text { terms }) = ctx.query.data(QueryType::Text) else {
            return Ok(Vec::new());
        };
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        source_tokens(ctx.content())
            .into_iter()
            .filter(|token| terms.contains(&token.text))
            .map(|token| LineMatch::at(ctx, token.offset_from, token.offset_to))
            .collect()
    }
}
