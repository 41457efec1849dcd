//! Request composition: query text and options to a [`QueryContext`].

use seek_config::{LogSettings, SearchSettings};
use seek_query::QueryError;
use tantivy::{
    Searcher,
    query::{Query, RegexQuery},
    schema::Field,
};

use super::types::{SearchFilter, SearchOptions, SearchRequest};
use crate::{
    error::IndexError,
    query::{
        QueryContext, QueryData, QueryType, build_log_query, build_tag_query,
        compile_text_query, expand_terms, parse_tag_query, strip_kind_clauses,
    },
    schema::IndexSchema,
};

/// Builds the sub-queries `request` asks for.
///
/// With no known option set the request is treated as plain source search.
/// When both source and definition search are requested, `kind:` clauses
/// only apply to the tag sub-query.
pub fn compose_query(
    schema: &IndexSchema,
    searcher: &Searcher,
    request: &SearchRequest,
    search: &SearchSettings,
    log: &LogSettings,
) -> Result<QueryContext, IndexError> {
    let options = if request.options.is_empty() {
        SearchOptions::SEARCH_IN_SOURCE
    } else {
        request.options
    };
    let mut ctx = QueryContext::new();

    let file_names = options.contains(SearchOptions::SEARCH_FOR_FILE_NAME);
    if file_names || options.contains(SearchOptions::SEARCH_IN_SOURCE) {
        let text = if options.contains(SearchOptions::SEARCH_IN_DEFS) {
            strip_kind_clauses(&request.query)
        } else {
            request.query.clone()
        };
        if let Some((query, patterns)) =
            compile_text_query(schema, &text, search.fuzzy_distance, file_names)?
        {
            let terms = expand_terms(searcher, schema.content, &patterns);
            ctx.add(QueryType::Text, query, Some(QueryData::Text { terms }))?;
        }
    }

    if options.contains(SearchOptions::SEARCH_IN_DEFS) {
        let tag = parse_tag_query(&request.query)?;
        let query = build_tag_query(schema, &tag);
        ctx.add(QueryType::Tag, query, Some(QueryData::Tag(tag)))?;
        ctx.set_filter_overlapping(true);
    }

    if options.contains(SearchOptions::FIND_LOG_TEXT) {
        let (query, data) = build_log_query(schema, &request.query, log);
        ctx.add(QueryType::Log, query, data)?;
    }

    Ok(ctx)
}

/// Regex filters on the raw directory and file name fields.
pub fn filter_queries(
    schema: &IndexSchema,
    filter: Option<&SearchFilter>,
) -> Result<Vec<Box<dyn Query>>, IndexError> {
    let Some(filter) = filter else {
        return Ok(Vec::new());
    };
    let mut queries = Vec::new();
    for (pattern, field) in [
        (&filter.dir_regex, schema.dir_path),
        (&filter.file_regex, schema.file_name),
    ] {
        if let Some(pattern) = pattern {
            queries.push(regex_filter(pattern, field)?);
        }
    }
    Ok(queries)
}

/// A whole-value regex match on a raw field.
fn regex_filter(pattern: &str, field: Field) -> Result<Box<dyn Query>, IndexError> {
    let query = RegexQuery::from_pattern(pattern, field).map_err(|e| {
        QueryError::compile(format!("invalid regex {pattern:?}: {e}")).with_query(pattern)
    })?;
    Ok(Box::new(query))
}
