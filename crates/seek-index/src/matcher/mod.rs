//! Turning retrieved documents into line matches.
//!
//! Each retrieved document gets a [`Context`]. A [`MatcherChain`] asks its
//! factories, in order, for a [`ResultMatcher`]; the first factory that
//! applies decides how the document's matches are computed. The standard
//! chain is log, then tag kind, then default highlighting.

mod context;
mod highlight;
mod log;
mod overlap;
mod tag_kind;

pub use context::Context;
pub use highlight::{HighlightMatcher, HighlightMatcherFactory};
pub use log::{LogMatcher, LogMatcherFactory};
pub use overlap::filter_overlapping;
use serde::{Deserialize, Serialize};
pub use tag_kind::{TagKindMatcher, TagKindMatcherFactory};

use crate::{error::IndexError, location::Location};

/// One match inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMatch {
    /// Where the match is.
    pub location: Location,
    /// Text of the matched line.
    pub line: String,
}

impl LineMatch {
    /// Builds a match for the byte range `start..end` of the context's content.
    pub(crate) fn at(ctx: &Context, start: usize, end: usize) -> Result<Self, IndexError> {
        let location = ctx.lines().offset_to_location(start, end.saturating_sub(start));
        let line = ctx.lines().line_content(location.line())?.to_string();
        Ok(Self { location, line })
    }
}

/// Matcher chosen for one document.
#[derive(Debug)]
pub enum ResultMatcher {
    /// Spans recorded by the log query.
    Log(LogMatcher),
    /// Tag occurrences filtered by kind.
    TagKind(TagKindMatcher),
    /// Occurrences of the matched query terms.
    Highlight(HighlightMatcher),
}

impl ResultMatcher {
    /// Computes the matches of the document in `ctx`.
    pub fn matches(&self, ctx: &Context) -> Result<Vec<LineMatch>, IndexError> {
        match self {
            Self::Log(m) => m.matches(ctx),
            Self::TagKind(m) => m.matches(ctx),
            Self::Highlight(m) => m.matches(ctx),
        }
    }
}

/// Decides whether it can match a document and, if so, how.
pub trait MatcherFactory: Send + Sync {
    /// Returns a matcher for `ctx`, or `None` if this factory does not apply.
    fn create(&self, ctx: &Context) -> Option<ResultMatcher>;
}

/// Ordered list of matcher factories.
pub struct MatcherChain {
    /// Factories in priority order.
    factories: Vec<Box<dyn MatcherFactory>>,
}

impl MatcherChain {
    /// Creates a chain trying `factories` in order.
    pub fn new(factories: Vec<Box<dyn MatcherFactory>>) -> Self {
        Self { factories }
    }

    /// Picks the first applicable matcher.
    pub fn select(&self, ctx: &Context) -> Option<ResultMatcher> {
        self.factories.iter().find_map(|f| f.create(ctx))
    }

    /// Matches one document, applying the overlap filter when requested.
    pub fn run(&self, ctx: &Context) -> Result<Vec<LineMatch>, IndexError> {
        let Some(matcher) = self.select(ctx) else {
            return Ok(Vec::new());
        };
        let matches = matcher.matches(ctx)?;
        if ctx.query.filter_overlapping() {
            Ok(filter_overlapping(matches))
        } else {
            Ok(matches)
        }
    }
}

impl Default for MatcherChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(LogMatcherFactory),
            Box::new(TagKindMatcherFactory),
            Box::new(HighlightMatcherFactory),
        ])
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use tantivy::{DocAddress, SegmentId, TantivyDocument, query::AllQuery};

    use super::*;
    use crate::{
        document::FileDocument,
        location::Location,
        query::{LogMatchCollector, QueryContext, QueryData, QueryType, Span, TagQuery},
        schema::IndexSchema,
        tags::{GenericKind, Tag, Tags},
    };

    fn context(query: QueryContext, content: &str, tags: Tags) -> Context {
        let schema = IndexSchema::new();
        let segment_id = SegmentId::generate_random();
        let doc: TantivyDocument = FileDocument::new("1", "/src/a.c", "text/x-c", content, tags)
            .to_tantivy(&schema)
            .unwrap();
        Context::from_document(Arc::new(query), DocAddress::new(0, 0), segment_id, &schema, doc)
    }

    fn text_query(terms: &[&str]) -> QueryContext {
        let mut query = QueryContext::new();
        query
            .add(
                QueryType::Text,
                Box::new(AllQuery),
                Some(QueryData::Text {
                    terms: terms.iter().map(|t| t.to_string()).collect::<HashSet<_>>(),
                }),
            )
            .unwrap();
        query
    }

    fn variable_tags() -> Tags {
        let mut tags = Tags::new();
        tags.add(
            4,
            Tag::new(GenericKind::Variable, Location::new(1, 5, 5).unwrap(), "x", "local"),
        );
        tags
    }

    #[test]
    fn highlight_is_the_fallback() {
        let ctx = context(text_query(&["x"]), "int x;\nx = 3;\n", Tags::new());
        let chain = MatcherChain::default();
        assert!(matches!(chain.select(&ctx), Some(ResultMatcher::Highlight(_))));

        let matches = chain.run(&ctx).unwrap();
        let locations: Vec<String> = matches.iter().map(|m| m.location.to_string()).collect();
        assert_eq!(locations, vec!["1:5-5", "2:1-1"]);
        assert_eq!(matches[1].line, "x = 3;");
    }

    #[test]
    fn tag_kind_wins_over_highlight() {
        let mut query = text_query(&["x"]);
        let tag = TagQuery {
            kinds: [GenericKind::Variable].into_iter().collect(),
            terms: Vec::new(),
        };
        query
            .add(QueryType::Tag, Box::new(AllQuery), Some(QueryData::Tag(tag)))
            .unwrap();
        query.set_filter_overlapping(true);

        let ctx = context(query, "int x;\nx = 3;\n", variable_tags());
        let matches = MatcherChain::default().run(&ctx).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].location, Location::new(1, 5, 5).unwrap());
        assert_eq!(matches[0].line, "int x;");
    }

    #[test]
    fn log_wins_over_everything() {
        let collector = LogMatchCollector::default();
        let mut query = text_query(&["x"]);
        query
            .add(QueryType::Log, Box::new(AllQuery), Some(QueryData::Log(collector.clone())))
            .unwrap();

        let ctx = context(query, "disk full\nfull disk now\n", Tags::new());
        collector.insert(
            ctx.segment_id,
            ctx.address.doc_id,
            vec![
                Span {
                    start: 0,
                    end: 9,
                    score: 0.5,
                },
                Span {
                    start: 10,
                    end: 19,
                    score: 0.9,
                },
            ],
        );

        let matches = MatcherChain::default().run(&ctx).unwrap();
        let locations: Vec<String> = matches.iter().map(|m| m.location.to_string()).collect();
        assert_eq!(locations, vec!["2:1-9", "1:1-9"]);
    }

    #[test]
    fn empty_chain_matches_nothing() {
        let ctx = context(text_query(&["x"]), "x", Tags::new());
        assert!(MatcherChain::new(Vec::new()).run(&ctx).unwrap().is_empty());
    }
}
