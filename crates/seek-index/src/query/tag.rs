//! Tag (definition) search.
//!
//! A tag query is whitespace-separated words. `kind:` words restrict matches
//! to tags of the listed generic kinds (`kind:function,type`); all other
//! words are matched against the texts of the file's tags.

use std::collections::HashSet;

use seek_query::QueryError;
use tantivy::{
    Term,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::IndexRecordOption,
};

use crate::{analyzer::source_tokens, schema::IndexSchema, tags::GenericKind};

/// Prefix of a kind clause.
const KIND_PREFIX: &str = "kind:";

/// A parsed tag query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    /// Allowed generic kinds; empty allows every kind.
    pub kinds: HashSet<GenericKind>,
    /// Lowercased symbol terms; empty matches every tag of the allowed kinds.
    pub terms: Vec<String>,
}

impl TagQuery {
    /// True if `kind` passes the kind filter.
    pub fn allows_kind(&self, kind: GenericKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    /// True if `term` passes the term filter.
    pub fn allows_term(&self, term: &str) -> bool {
        self.terms.is_empty() || self.terms.iter().any(|t| t == term)
    }
}

/// True for words introducing a kind clause.
fn is_kind_clause(word: &str) -> bool {
    word.get(..KIND_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(KIND_PREFIX))
}

/// Parses tag query text.
pub fn parse_tag_query(text: &str) -> Result<TagQuery, QueryError> {
    let mut query = TagQuery::default();
    for word in text.split_whitespace() {
        if is_kind_clause(word) {
            for name in word[KIND_PREFIX.len()..].split(',').filter(|n| !n.is_empty()) {
                let kind: GenericKind = name.parse().map_err(|_| {
                    QueryError::compile(format!("unknown tag kind: {name}")).with_query(text)
                })?;
                query.kinds.insert(kind);
            }
        } else {
            for token in source_tokens(word) {
                if !query.terms.contains(&token.text) {
                    query.terms.push(token.text);
                }
            }
        }
    }

    if query.kinds.is_empty() && query.terms.is_empty() {
        return Err(QueryError::compile("tag query has no symbols or kinds").with_query(text));
    }
    Ok(query)
}

/// Removes `kind:` clauses, leaving the words for free-text search.
pub fn strip_kind_clauses(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !is_kind_clause(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the retrieval query for a tag search.
///
/// Symbol terms must hit the definitions field; kinds must hit the tag kind
/// field. Each group is a disjunction.
pub fn build_tag_query(schema: &IndexSchema, query: &TagQuery) -> Box<dyn Query> {
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

    if !query.terms.is_empty() {
        let terms = query
            .terms
            .iter()
            .map(|t| should_term(Term::from_field_text(schema.definitions, t)))
            .collect();
        clauses.push((Occur::Must, Box::new(BooleanQuery::new(terms))));
    }

    if !query.kinds.is_empty() {
        let mut kinds: Vec<GenericKind> = query.kinds.iter().copied().collect();
        kinds.sort();
        let kinds = kinds
            .into_iter()
            .map(|k| should_term(Term::from_field_text(schema.tag_kind, k.as_str())))
            .collect();
        clauses.push((Occur::Must, Box::new(BooleanQuery::new(kinds))));
    }

    Box::new(BooleanQuery::new(clauses))
}

/// A SHOULD clause for one term.
fn should_term(term: Term) -> (Occur, Box<dyn Query>) {
    (
        Occur::Should,
        Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
    )
}
