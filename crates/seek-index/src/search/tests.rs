use std::{sync::Arc, time::Duration};

use seek_config::{LogSettings, SearchSettings};
use tempfile::TempDir;

use super::*;
use crate::{
    document::FileDocument,
    location::Location,
    query::QueryType,
    tags::{GenericKind, Tag, Tags},
};

fn open_index(files: Vec<FileDocument>) -> (TempDir, IndexHandle) {
    let temp = TempDir::new().unwrap();
    let handle = IndexHandle::open(temp.path(), 15_000_000).unwrap();
    for file in files {
        let doc = file.to_tantivy(handle.schema()).unwrap();
        handle.add_document(doc).unwrap();
    }
    handle.commit().unwrap();
    handle.maybe_refresh_blocking().unwrap();
    (temp, handle)
}

fn executor() -> SearchExecutor {
    let pool = Arc::new(HandoffPool::new("match", Duration::from_secs(1)));
    SearchExecutor::new(pool, SearchSettings::default(), LogSettings::default())
}

fn file(id: &str, path: &str, content: &str) -> FileDocument {
    FileDocument::new(id, path, "text/plain", content, Tags::new())
}

fn variable_x() -> Tags {
    let mut tags = Tags::new();
    tags.add(
        4,
        Tag::new(GenericKind::Variable, Location::new(1, 5, 5).unwrap(), "x", "local"),
    );
    tags
}

#[test]
fn text_search_highlights_terms() {
    let (_temp, handle) = open_index(vec![
        file("a", "/src/a.c", "int needle;\n"),
        file("b", "/src/b.c", "nothing here\n"),
    ]);
    let request = SearchRequest::new("needle", SearchOptions::SEARCH_IN_SOURCE);
    let results = executor().execute(&handle, &request).unwrap();

    assert_eq!(results.total_hits, 1);
    assert_eq!(results.files.len(), 1);
    let found = &results.files[0];
    assert_eq!(found.file_id, "a");
    assert_eq!(found.file_name, "a.c");
    assert_eq!(found.file_path, "/src/a.c");
    assert_eq!(found.matches.len(), 1);
    assert_eq!(found.matches[0].location, Location::new(1, 5, 10).unwrap());
    assert_eq!(found.matches[0].line, "int needle;");
}

#[test]
fn tag_search_by_kind() {
    let (_temp, handle) = open_index(vec![
        FileDocument::new("1", "/src/x.c", "text/x-c", "int x;\nx = 3;\n", variable_x()),
        file("2", "/src/y.c", "x = 4;\n"),
    ]);
    let request = SearchRequest::new("kind:variable", SearchOptions::SEARCH_IN_DEFS);
    let results = executor().execute(&handle, &request).unwrap();

    assert_eq!(results.total_hits, 1);
    let matches = &results.files[0].matches;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].location.line(), 1);
    assert_eq!(matches[0].location.start_column(), 5);
    assert_eq!(matches[0].location.end_column(), 5);
}

#[test]
fn short_log_query_matches_nothing() {
    let (_temp, handle) = open_index(vec![file("1", "/var/log/app.log", "disk full\n")]);
    let request = SearchRequest::new("disk", SearchOptions::FIND_LOG_TEXT);
    let results = executor().execute(&handle, &request).unwrap();
    assert_eq!(results.total_hits, 0);
    assert!(results.files.is_empty());
}

#[test]
fn log_search_reports_spans() {
    let (_temp, handle) = open_index(vec![
        file("1", "/var/log/app.log", "boot ok\nerror: disk is full\n"),
        file("2", "/var/log/other.log", "all quiet\n"),
    ]);
    let request = SearchRequest::new("disk full", SearchOptions::FIND_LOG_TEXT);
    let results = executor().execute(&handle, &request).unwrap();

    assert_eq!(results.total_hits, 1);
    let matches = &results.files[0].matches;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].location.line(), 2);
    assert_eq!(matches[0].line, "error: disk is full");
}

#[test]
fn filters_restrict_directories_and_names() {
    let (_temp, handle) = open_index(vec![
        file("1", "/src/main.c", "shared\n"),
        file("2", "/test/main.c", "shared\n"),
        file("3", "/src/util.h", "shared\n"),
    ]);
    let exec = executor();

    let mut request = SearchRequest::new("shared", SearchOptions::SEARCH_IN_SOURCE);
    request.filter = Some(SearchFilter {
        dir_regex: Some("/src".into()),
        file_regex: None,
    });
    assert_eq!(exec.execute(&handle, &request).unwrap().total_hits, 2);

    request.filter = Some(SearchFilter {
        dir_regex: Some("/src".into()),
        file_regex: Some(".*\\.c".into()),
    });
    let results = exec.execute(&handle, &request).unwrap();
    assert_eq!(results.total_hits, 1);
    assert_eq!(results.files[0].file_id, "1");
}

#[test]
fn invalid_filter_is_a_request_error() {
    let (_temp, handle) = open_index(vec![file("1", "/a.c", "x\n")]);
    let mut request = SearchRequest::new("x", SearchOptions::SEARCH_IN_SOURCE);
    request.filter = Some(SearchFilter {
        dir_regex: Some("(".into()),
        file_regex: None,
    });
    let err = executor().execute(&handle, &request).unwrap_err();
    assert!(err.is_request_error());
}

#[test]
fn paging_keeps_total() {
    let (_temp, handle) = open_index(vec![
        file("1", "/a.c", "token\n"),
        file("2", "/b.c", "token\n"),
        file("3", "/c.c", "token\n"),
    ]);
    let mut request = SearchRequest::new("token", SearchOptions::SEARCH_IN_SOURCE);
    request.range = Some(SearchRange {
        start: 1,
        max_size: 1,
    });
    let results = executor().execute(&handle, &request).unwrap();
    assert_eq!(results.total_hits, 3);
    assert_eq!(results.files.len(), 1);

    request.range = Some(SearchRange {
        start: 0,
        max_size: 0,
    });
    let results = executor().execute(&handle, &request).unwrap();
    assert_eq!(results.total_hits, 3);
    assert!(results.files.is_empty());
}

#[test]
fn empty_query_skips_the_index() {
    let (_temp, handle) = open_index(vec![file("1", "/a.c", "x\n")]);
    let request = SearchRequest::new("", SearchOptions::SEARCH_IN_SOURCE);
    assert_eq!(
        executor().execute(&handle, &request).unwrap(),
        SearchResults::default()
    );
}

#[test]
fn file_name_search_matches_substrings() {
    let (_temp, handle) = open_index(vec![
        file("1", "/src/Parser.rs", "fn a() {}\n"),
        file("2", "/src/lexer.rs", "fn b() {}\n"),
    ]);
    let request = SearchRequest::new("parse", SearchOptions::SEARCH_FOR_FILE_NAME);
    let results = executor().execute(&handle, &request).unwrap();
    assert_eq!(results.total_hits, 1);
    assert_eq!(results.files[0].file_name, "Parser.rs");
}

#[test]
fn source_and_defs_split_kind_clauses() {
    let (_temp, handle) = open_index(Vec::new());
    let searcher = handle.searcher();
    let request = SearchRequest::new(
        "kind:variable x",
        SearchOptions::SEARCH_IN_SOURCE | SearchOptions::SEARCH_IN_DEFS,
    );
    let ctx = compose_query(
        handle.schema(),
        &searcher,
        &request,
        &SearchSettings::default(),
        &LogSettings::default(),
    )
    .unwrap();
    assert!(ctx.get_query(QueryType::Text).is_some());
    assert!(ctx.get_query(QueryType::Tag).is_some());
    assert!(ctx.get_query(QueryType::Log).is_none());
    assert!(ctx.filter_overlapping());
}

#[test]
fn options_display_and_serde() {
    let options = SearchOptions::SEARCH_IN_DEFS | SearchOptions::FIND_LOG_TEXT;
    assert_eq!(options.to_string(), "defs|log");
    assert_eq!(serde_json::to_string(&options).unwrap(), "6");
    let parsed: SearchOptions = serde_json::from_str("9").unwrap();
    assert!(parsed.contains(SearchOptions::SEARCH_IN_SOURCE));
    assert!(parsed.contains(SearchOptions::SEARCH_FOR_FILE_NAME));
    assert!(SearchOptions::from_bits(0).is_empty());
}

fn boosted(id: &str, content: &str, tags: Tags, boost: f64) -> FileDocument {
    let mut doc = FileDocument::new(id, format!("/src/{id}.c"), "text/x-c", content, tags);
    doc.boost = boost;
    doc
}

fn scores(results: &SearchResults) -> Vec<(&str, f32)> {
    results
        .files
        .iter()
        .map(|f| (f.file_id.as_str(), f.score))
        .collect()
}

#[test]
fn boost_scales_text_and_tag_scores() {
    let (_temp, handle) = open_index(vec![
        boosted("a", "int x;\nx = needle;\n", variable_x(), 1.0),
        boosted("b", "int x;\nx = needle;\n", variable_x(), 10.0),
    ]);
    let exec = executor();

    for (query, options) in [
        ("needle", SearchOptions::SEARCH_IN_SOURCE),
        ("kind:variable", SearchOptions::SEARCH_IN_DEFS),
    ] {
        let results = exec.execute(&handle, &SearchRequest::new(query, options)).unwrap();
        let ranked = scores(&results);
        assert_eq!(ranked.len(), 2, "{query}");
        assert_eq!(ranked[0].0, "b", "{query}");
        assert!((ranked[0].1 / ranked[1].1 - 10.0).abs() < 1e-3, "{query}: {ranked:?}");
    }
}

#[test]
fn boost_leaves_log_scores_alone() {
    let (_temp, handle) = open_index(vec![
        boosted("a", "error: disk full\n", Tags::new(), 1.0),
        boosted("b", "error: disk full\n", Tags::new(), 10.0),
    ]);
    let request = SearchRequest::new("disk full", SearchOptions::FIND_LOG_TEXT);
    let results = executor().execute(&handle, &request).unwrap();

    let ranked = scores(&results);
    assert_eq!(ranked.len(), 2);
    assert!((ranked[0].1 - ranked[1].1).abs() < 1e-6, "{ranked:?}");
}
