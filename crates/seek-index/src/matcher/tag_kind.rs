//! Tag search matcher.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::{Context, LineMatch, MatcherFactory, ResultMatcher};
use crate::{
    analyzer::source_tokens,
    error::IndexError,
    query::{QueryData, QueryType, TagQuery},
    tags::Tag,
};

/// Applies when the request has a tag sub-query.
pub struct TagKindMatcherFactory;

impl MatcherFactory for TagKindMatcherFactory {
    fn create(&self, ctx: &Context) -> Option<ResultMatcher> {
        ctx.query.get_query(QueryType::Tag)?;
        let query = match ctx.query.data(QueryType::Tag) {
            Some(QueryData::Tag(query)) => query.clone(),
            _ => TagQuery::default(),
        };
        Some(ResultMatcher::TagKind(TagKindMatcher { query }))
    }
}

/// Emits the tags of allowed kinds whose text carries a query term.
#[derive(Debug)]
pub struct TagKindMatcher {
    /// Kinds and symbol terms of the request.
    query: TagQuery,
}

impl TagKindMatcher {
    /// Matches of the context's document, in content order.
    ///
    /// A tag starting where a source token starts highlights that token.
    /// Tags starting on a separator (`~Foo`, `operator==`) are reported at
    /// their own location. Occurrences of a defined symbol away from any
    /// tag are skipped.
    pub fn matches(&self, ctx: &Context) -> Result<Vec<LineMatch>, IndexError> {
        let tags = ctx.tags()?;
        let mut found: BTreeMap<usize, LineMatch> = BTreeMap::new();
        let mut token_starts = HashSet::new();
        let defined: HashSet<String> = tags
            .all_tags()
            .flat_map(|(_, tag)| source_tokens(&tag.text))
            .map(|token| token.text)
            .collect();

        for token in source_tokens(ctx.content()) {
            token_starts.insert(token.offset_from);
            let at_offset = tags.all_at(token.offset_from);
            if at_offset.is_empty() {
                if defined.contains(&token.text) {
                    debug!(
                        file = ctx.file_path(),
                        offset = token.offset_from,
                        token = %token.text,
                        "no tag at symbol offset"
                    );
                }
                continue;
            }
            if at_offset.iter().any(|tag| self.allows(tag)) {
                found.insert(
                    token.offset_from,
                    LineMatch::at(ctx, token.offset_from, token.offset_to)?,
                );
            }
        }

        for (offset, tag) in tags.all_tags() {
            if token_starts.contains(&offset) || found.contains_key(&offset) || !self.allows(tag) {
                continue;
            }
            let line = ctx.lines().line_content(tag.location.line())?.to_string();
            found.insert(offset, LineMatch {
                location: tag.location,
                line,
            });
        }

        Ok(found.into_values().collect())
    }

    /// True if `tag` has an allowed kind and one of its words is a query term.
    fn allows(&self, tag: &Tag) -> bool {
        if !self.query.allows_kind(tag.generic_kind) {
            return false;
        }
        self.query.terms.is_empty()
            || source_tokens(&tag.text)
                .iter()
                .any(|token| self.query.allows_term(&token.text))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tantivy::{DocAddress, SegmentId, query::AllQuery};

    use super::*;
    use crate::{
        document::FileDocument,
        location::Location,
        query::QueryContext,
        schema::IndexSchema,
        tags::{GenericKind, Tags},
    };

    fn context(tag_query: TagQuery, content: &str, tags: Tags) -> Context {
        let schema = IndexSchema::new();
        let mut query = QueryContext::new();
        query
            .add(QueryType::Tag, Box::new(AllQuery), Some(QueryData::Tag(tag_query)))
            .unwrap();
        let doc = FileDocument::new("1", "/src/a.cc", "text/x-c++", content, tags)
            .to_tantivy(&schema)
            .unwrap();
        Context::from_document(
            Arc::new(query),
            DocAddress::new(0, 0),
            SegmentId::generate_random(),
            &schema,
            doc,
        )
    }

    fn kinds(kinds: &[GenericKind]) -> TagQuery {
        TagQuery {
            kinds: kinds.iter().copied().collect(),
            terms: Vec::new(),
        }
    }

    fn locations(matcher: &TagKindMatcher, ctx: &Context) -> Vec<String> {
        matcher
            .matches(ctx)
            .unwrap()
            .iter()
            .map(|m| m.location.to_string())
            .collect()
    }

    #[test]
    fn destructor_tag_is_reported_at_its_location() {
        let mut tags = Tags::new();
        tags.add(
            5,
            Tag::new(GenericKind::Function, Location::new(1, 6, 9).unwrap(), "~Foo", "function"),
        );
        let ctx = context(kinds(&[GenericKind::Function]), "Foo::~Foo() {}\n", tags);
        let matcher = TagKindMatcher {
            query: kinds(&[GenericKind::Function]),
        };
        assert_eq!(locations(&matcher, &ctx), vec!["1:6-9"]);

        let by_term = TagKindMatcher {
            query: TagQuery {
                kinds: HashSet::new(),
                terms: vec!["foo".into()],
            },
        };
        assert_eq!(locations(&by_term, &ctx), vec!["1:6-9"]);
    }

    #[test]
    fn qualified_tag_highlights_its_first_token() {
        let mut tags = Tags::new();
        tags.add(
            6,
            Tag::new(GenericKind::Module, Location::new(1, 7, 14).unwrap(), "std::vec", "namespace"),
        );
        tags.add(
            20,
            Tag::new(GenericKind::Variable, Location::new(2, 5, 5).unwrap(), "v", "local"),
        );
        let content = "using std::vec;\nint v;\n";
        let ctx = context(TagQuery::default(), content, tags);

        let vec_only = TagKindMatcher {
            query: TagQuery {
                kinds: HashSet::new(),
                terms: vec!["vec".into()],
            },
        };
        assert_eq!(locations(&vec_only, &ctx), vec!["1:7-9"]);

        let everything = TagKindMatcher {
            query: TagQuery::default(),
        };
        assert_eq!(locations(&everything, &ctx), vec!["1:7-9", "2:5-5"]);
    }

    #[test]
    fn kind_filter_and_untagged_occurrences() {
        let mut tags = Tags::new();
        tags.add(
            4,
            Tag::new(GenericKind::Variable, Location::new(1, 5, 5).unwrap(), "n", "local"),
        );
        let ctx = context(kinds(&[GenericKind::Variable]), "int n;\nn = 3;\n", tags);

        let variables = TagKindMatcher {
            query: kinds(&[GenericKind::Variable]),
        };
        assert_eq!(locations(&variables, &ctx), vec!["1:5-5"]);

        let functions = TagKindMatcher {
            query: kinds(&[GenericKind::Function]),
        };
        assert!(locations(&functions, &ctx).is_empty());
    }
}
