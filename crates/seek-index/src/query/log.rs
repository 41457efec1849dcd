//! Fuzzy log-line search.
//!
//! A log query looks for lines containing most of the query's words close
//! together, in any order. Candidate documents come from an OR of term
//! queries; the scorer then re-reads each candidate's content and looks for
//! spans, recording every span it finds in a shared [`LogMatchCollector`]
//! for the log matcher to turn into line matches later.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use seek_config::LogSettings;
use tantivy::{
    DocId, DocSet, Score, SegmentId, SegmentReader, TERMINATED, TantivyDocument, TantivyError,
    Term,
    query::{BooleanQuery, EmptyQuery, EnableScoring, Explanation, Occur, Query, Scorer, TermQuery, Weight},
    schema::{Field, IndexRecordOption},
    store::StoreReader,
};
use tracing::warn;

use super::QueryData;
use crate::{
    analyzer::{SourceToken, distinct_terms, source_tokens},
    document::stored_text,
    schema::IndexSchema,
};

/// Score deducted per pair of query terms found out of order, relative to
/// the number of query terms.
pub const SWAP_PENALTY: f32 = 0.1;

/// Store blocks cached per scorer.
const STORE_CACHE_BLOCKS: usize = 10;

/// A candidate match inside one line of a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    /// Byte offset of the first matched token.
    pub start: usize,
    /// Byte offset one past the last matched token.
    pub end: usize,
    /// Quality in `[0, 1]`.
    pub score: f32,
}

/// Spans found per document while a log query was scored.
#[derive(Debug, Clone, Default)]
pub struct LogMatchCollector(Arc<Mutex<HashMap<(SegmentId, DocId), Vec<Span>>>>);

impl LogMatchCollector {
    /// Records the spans of a document, replacing earlier ones.
    pub fn insert(&self, segment: SegmentId, doc: DocId, spans: Vec<Span>) {
        self.0.lock().insert((segment, doc), spans);
    }

    /// Spans recorded for a document.
    pub fn spans_for(&self, segment: SegmentId, doc: DocId) -> Vec<Span> {
        self.0.lock().get(&(segment, doc)).cloned().unwrap_or_default()
    }

    /// Number of documents with recorded spans.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a log query for `text`.
///
/// Queries with fewer than `min_terms` distinct terms never match and carry
/// no collector.
pub fn build_log_query(
    schema: &IndexSchema,
    text: &str,
    settings: &LogSettings,
) -> (Box<dyn Query>, Option<QueryData>) {
    let terms = distinct_terms(text);
    if terms.len() < settings.min_terms {
        return (Box::new(EmptyQuery), None);
    }

    let clauses = terms
        .iter()
        .map(|t| {
            let query: Box<dyn Query> = Box::new(TermQuery::new(
                Term::from_field_text(schema.content, t),
                IndexRecordOption::Basic,
            ));
            (Occur::Should, query)
        })
        .collect();

    let collector = LogMatchCollector::default();
    let query = LogSpanQuery {
        candidates: BooleanQuery::new(clauses),
        content: schema.content,
        terms: Arc::new(terms),
        settings: settings.clone(),
        collector: collector.clone(),
    };
    (Box::new(query), Some(QueryData::Log(collector)))
}

/// Finds the spans of `terms` in `content`.
///
/// Spans never cross lines and never overlap. A span grows from a query term
/// while the next query term follows within `max_gap` other tokens and has
/// not been seen in the span yet. Spans with fewer than `min_terms` distinct
/// terms are dropped, as are spans scoring more than `max_score_diff` below
/// the best span.
pub fn find_spans(content: &str, terms: &[String], settings: &LogSettings) -> Vec<Span> {
    let index: HashMap<&str, usize> = terms.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
    let required = settings.min_terms.min(terms.len()).max(1);

    let mut spans = Vec::new();
    let mut line_start = 0;
    for line in content.split_inclusive('\n') {
        let tokens = source_tokens(line);
        for (first, last, order) in line_windows(&tokens, &index, settings.max_gap) {
            if order.len() < required {
                continue;
            }
            spans.push(Span {
                start: line_start + tokens[first].offset_from,
                end: line_start + tokens[last].offset_to,
                score: span_score(&order, terms.len()),
            });
        }
        line_start += line.len();
    }

    if let Some(diff) = settings.max_score_diff {
        let best = spans.iter().map(|s| s.score).fold(0.0_f32, f32::max);
        spans.retain(|s| s.score >= best - diff);
    }
    spans
}

/// Greedy windows over one line's tokens as `(first, last, term order)`.
fn line_windows(
    tokens: &[SourceToken],
    index: &HashMap<&str, usize>,
    max_gap: usize,
) -> Vec<(usize, usize, Vec<usize>)> {
    let mut windows = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let Some(&term) = index.get(tokens[pos].text.as_str()) else {
            pos += 1;
            continue;
        };

        let mut order = vec![term];
        let mut last = pos;
        for (next, token) in tokens.iter().enumerate().skip(pos + 1) {
            if next - last - 1 > max_gap {
                break;
            }
            if let Some(&term) = index.get(token.text.as_str()) {
                if order.contains(&term) {
                    break;
                }
                order.push(term);
                last = next;
            }
        }

        windows.push((pos, last, order));
        pos = last + 1;
    }
    windows
}

/// Share of query terms found, less the swap penalty.
fn span_score(order: &[usize], term_count: usize) -> f32 {
    let swaps = order
        .iter()
        .enumerate()
        .map(|(i, a)| order[i + 1..].iter().filter(|b| *b < a).count())
        .sum::<usize>();
    let n = term_count as f32;
    ((order.len() as f32 - SWAP_PENALTY * swaps as f32) / n).max(0.0)
}

/// Query matching documents that contain log spans.
#[derive(Debug, Clone)]
pub struct LogSpanQuery {
    /// Documents containing any query term.
    candidates: BooleanQuery,
    /// Field holding the stored content.
    content: Field,
    /// Distinct lowercased query terms in query order.
    terms: Arc<Vec<String>>,
    /// Span settings.
    settings: LogSettings,
    /// Receives the spans of every matching document.
    collector: LogMatchCollector,
}

impl Query for LogSpanQuery {
    fn weight(&self, enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        Ok(Box::new(LogSpanWeight {
            candidates: self.candidates.weight(enable_scoring)?,
            content: self.content,
            terms: Arc::clone(&self.terms),
            settings: self.settings.clone(),
            collector: self.collector.clone(),
        }))
    }

    fn query_terms<'a>(&'a self, visitor: &mut dyn FnMut(&'a Term, bool)) {
        self.candidates.query_terms(visitor);
    }
}

/// Weight of a [`LogSpanQuery`].
struct LogSpanWeight {
    /// Weight of the candidate query.
    candidates: Box<dyn Weight>,
    /// Field holding the stored content.
    content: Field,
    /// Distinct lowercased query terms.
    terms: Arc<Vec<String>>,
    /// Span settings.
    settings: LogSettings,
    /// Span sink.
    collector: LogMatchCollector,
}

impl Weight for LogSpanWeight {
    fn scorer(&self, reader: &SegmentReader, boost: Score) -> tantivy::Result<Box<dyn Scorer>> {
        let scorer = LogSpanScorer::new(
            self.candidates.scorer(reader, 1.0)?,
            reader.get_store_reader(STORE_CACHE_BLOCKS)?,
            reader.segment_id(),
            boost,
            self,
        );
        Ok(Box::new(scorer))
    }

    fn explain(&self, reader: &SegmentReader, doc: DocId) -> tantivy::Result<Explanation> {
        let mut scorer = self.scorer(reader, 1.0)?;
        if scorer.seek(doc) != doc {
            return Err(TantivyError::InvalidArgument(format!(
                "document #({doc}) does not match"
            )));
        }
        Ok(Explanation::new("best log span", scorer.score()))
    }
}

/// Scorer keeping only candidates with at least one span.
struct LogSpanScorer {
    /// Candidate documents.
    candidates: Box<dyn Scorer>,
    /// Stored fields of the segment.
    store: StoreReader,
    /// Segment being scored.
    segment: SegmentId,
    /// Field holding the stored content.
    content: Field,
    /// Distinct lowercased query terms.
    terms: Arc<Vec<String>>,
    /// Span settings.
    settings: LogSettings,
    /// Span sink.
    collector: LogMatchCollector,
    /// Query boost.
    boost: Score,
    /// Score of the current document.
    score: Score,
}

impl LogSpanScorer {
    /// Wraps the candidate scorer and moves to the first matching document.
    fn new(
        candidates: Box<dyn Scorer>,
        store: StoreReader,
        segment: SegmentId,
        boost: Score,
        weight: &LogSpanWeight,
    ) -> Self {
        let mut scorer = Self {
            candidates,
            store,
            segment,
            content: weight.content,
            terms: Arc::clone(&weight.terms),
            settings: weight.settings.clone(),
            collector: weight.collector.clone(),
            boost,
            score: 0.0,
        };
        let first = scorer.candidates.doc();
        if first != TERMINATED && !scorer.evaluate(first) {
            scorer.advance();
        }
        scorer
    }

    /// Finds the spans of `doc`, recording them if there are any.
    fn evaluate(&mut self, doc: DocId) -> bool {
        let stored: TantivyDocument = match self.store.get(doc) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(doc, error = %e, "failed to load document for log matching");
                return false;
            }
        };
        let spans = find_spans(stored_text(&stored, self.content), &self.terms, &self.settings);
        let Some(best) = spans.iter().map(|s| s.score).reduce(f32::max) else {
            return false;
        };
        self.score = best * self.boost;
        self.collector.insert(self.segment, doc, spans);
        true
    }
}

impl DocSet for LogSpanScorer {
    fn advance(&mut self) -> DocId {
        loop {
            let doc = self.candidates.advance();
            if doc == TERMINATED || self.evaluate(doc) {
                return doc;
            }
        }
    }

    fn doc(&self) -> DocId {
        self.candidates.doc()
    }

    fn size_hint(&self) -> u32 {
        self.candidates.size_hint()
    }
}

impl Scorer for LogSpanScorer {
    fn score(&mut self) -> Score {
        self.score
    }
}

#[cfg(test)]
mod tests {
    use tantivy::{Index, collector::TopDocs};

    use super::*;
    use crate::analyzer::register_tokenizers;

    fn settings() -> LogSettings {
        LogSettings::default()
    }

    fn terms(text: &str) -> Vec<String> {
        distinct_terms(text)
    }

    #[test]
    fn in_order_span() {
        let content = "INFO connection refused by peer\n";
        let spans = find_spans(content, &terms("connection refused"), &settings());
        assert_eq!(spans.len(), 1);
        assert_eq!(&content[spans[0].start..spans[0].end], "connection refused");
        assert!((spans[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn swapped_terms_are_penalized() {
        let content = "refused the connection";
        let spans = find_spans(content, &terms("connection refused"), &settings());
        assert_eq!(spans.len(), 1);
        assert_eq!(&content[spans[0].start..spans[0].end], "refused the connection");
        assert!((spans[0].score - 0.95).abs() < 1e-6);
    }

    #[test]
    fn gap_limit_splits_windows() {
        let content = "connection a b c d refused";
        assert!(find_spans(content, &terms("connection refused"), &settings()).is_empty());

        let near = "connection a b c refused";
        assert_eq!(find_spans(near, &terms("connection refused"), &settings()).len(), 1);
    }

    #[test]
    fn spans_stay_within_a_line() {
        let content = "connection\nrefused";
        assert!(find_spans(content, &terms("connection refused"), &settings()).is_empty());
    }

    #[test]
    fn repeated_term_starts_new_window() {
        let content = "disk full disk full";
        let spans = find_spans(content, &terms("disk full"), &settings());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].start, 10);
    }

    #[test]
    fn offsets_account_for_previous_lines() {
        let content = "boot ok\nwarn: disk almost full\n";
        let spans = find_spans(content, &terms("disk full"), &settings());
        assert_eq!(spans.len(), 1);
        assert_eq!(&content[spans[0].start..spans[0].end], "disk almost full");
    }

    #[test]
    fn score_diff_cutoff() {
        let content = "a b c\nc b a\n";
        let mut cutoff = settings();
        cutoff.max_score_diff = Some(0.05);
        let all = find_spans(content, &terms("a b c"), &settings());
        let kept = find_spans(content, &terms("a b c"), &cutoff);
        assert_eq!(all.len(), 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].start, 0);
    }

    #[test]
    fn short_queries_never_match() {
        let schema = IndexSchema::new();
        let (query, data) = build_log_query(&schema, "refused", &settings());
        assert!(data.is_none());
        assert!(format!("{query:?}").contains("EmptyQuery"));
    }

    #[test]
    fn scorer_records_spans() {
        let schema = IndexSchema::new();
        let index = Index::create_in_ram(schema.schema().clone());
        register_tokenizers(&index);
        let mut writer = index.writer::<TantivyDocument>(15_000_000).unwrap();
        for content in ["connection refused", "refused", "no match here"] {
            let mut doc = TantivyDocument::new();
            doc.add_text(schema.content, content);
            writer.add_document(doc).unwrap();
        }
        writer.commit().unwrap();
        let searcher = index.reader().unwrap().searcher();

        let (query, data) = build_log_query(&schema, "connection refused", &settings());
        let Some(QueryData::Log(collector)) = data else {
            panic!("expected log data");
        };
        let hits = searcher.search(&*query, &TopDocs::with_limit(10)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(collector.len(), 1);

        let address = hits[0].1;
        let segment = searcher.segment_reader(address.segment_ord).segment_id();
        let spans = collector.spans_for(segment, address.doc_id);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start, spans[0].end), (0, 18));
    }
}
