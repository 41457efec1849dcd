//! Inputs for building suggestion databases.

use std::{collections::HashSet, iter::Peekable, vec};

use tantivy::{
    DocAddress, Searcher, SegmentOrdinal, TantivyDocument,
    schema::{Field, Value},
};
use tracing::warn;

use crate::tags::Tags;

/// One suggestion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuggestInput {
    /// Lowercased lookup key.
    pub key: String,
    /// Ranking weight; higher ranks first.
    pub weight: u64,
    /// Text returned to the caller, if different from the key.
    pub payload: Option<String>,
}

impl SuggestInput {
    /// Text shown for this input.
    pub fn display(&self) -> &str {
        self.payload.as_deref().unwrap_or(&self.key)
    }
}

/// Stored documents of every live document in a snapshot.
struct LiveDocuments {
    /// The snapshot.
    searcher: Searcher,
    /// Next segment to walk.
    next_segment: usize,
    /// Remaining documents of the current segment.
    pending: vec::IntoIter<DocAddress>,
}

impl LiveDocuments {
    /// Walks `searcher` from the first segment.
    fn new(searcher: Searcher) -> Self {
        Self {
            searcher,
            next_segment: 0,
            pending: Vec::new().into_iter(),
        }
    }
}

impl Iterator for LiveDocuments {
    type Item = TantivyDocument;

    fn next(&mut self) -> Option<TantivyDocument> {
        loop {
            if let Some(address) = self.pending.next() {
                match self.searcher.doc::<TantivyDocument>(address) {
                    Ok(doc) => return Some(doc),
                    Err(e) => {
                        warn!(?address, error = %e, "skipping unreadable document");
                        continue;
                    }
                }
            }

            let reader = self.searcher.segment_readers().get(self.next_segment)?;
            let ord = self.next_segment as SegmentOrdinal;
            self.pending = reader
                .doc_ids_alive()
                .map(|doc| DocAddress::new(ord, doc))
                .collect::<Vec<_>>()
                .into_iter();
            self.next_segment += 1;
        }
    }
}

/// Symbol candidates from the tags of every live document.
///
/// Each document contributes its distinct `(key, weight, payload)` triples;
/// the weight comes from the tag's generic kind. Documents whose tags cannot
/// be decoded are logged and skipped.
pub struct TagInputIterator {
    /// Documents still to read.
    docs: LiveDocuments,
    /// Field holding the tags blob.
    tags: Field,
    /// Inputs of the current document.
    pending: vec::IntoIter<SuggestInput>,
}

impl TagInputIterator {
    /// Walks every live document of `searcher`.
    pub fn new(searcher: Searcher, tags: Field) -> Self {
        Self {
            docs: LiveDocuments::new(searcher),
            tags,
            pending: Vec::new().into_iter(),
        }
    }
}

impl Iterator for TagInputIterator {
    type Item = SuggestInput;

    fn next(&mut self) -> Option<SuggestInput> {
        loop {
            if let Some(input) = self.pending.next() {
                return Some(input);
            }
            let doc = self.docs.next()?;
            let Some(bytes) = doc.get_first(self.tags).and_then(|v| v.as_bytes()) else {
                continue;
            };
            match Tags::from_bytes(bytes) {
                Ok(tags) => self.pending = tag_inputs(&tags).into_iter(),
                Err(e) => warn!(error = %e, "skipping document with corrupt tags"),
            }
        }
    }
}

/// Distinct inputs of one document's tags, in offset order.
fn tag_inputs(tags: &Tags) -> Vec<SuggestInput> {
    let mut seen = HashSet::new();
    let mut inputs = Vec::new();
    for (_, tag) in tags.all_tags() {
        if tag.text.is_empty() {
            continue;
        }
        let input = SuggestInput {
            key: tag.text.to_lowercase(),
            weight: tag.generic_kind.suggestion_weight(),
            payload: Some(tag.text.clone()),
        };
        if seen.insert(input.clone()) {
            inputs.push(input);
        }
    }
    inputs
}

/// File name candidates, one per live document, each with weight 1.
pub struct FileNameInputIterator {
    /// Documents still to read.
    docs: LiveDocuments,
    /// Field holding the file name.
    file_name: Field,
}

impl FileNameInputIterator {
    /// Walks every live document of `searcher`.
    pub fn new(searcher: Searcher, file_name: Field) -> Self {
        Self {
            docs: LiveDocuments::new(searcher),
            file_name,
        }
    }
}

impl Iterator for FileNameInputIterator {
    type Item = SuggestInput;

    fn next(&mut self) -> Option<SuggestInput> {
        loop {
            let doc = self.docs.next()?;
            let name = doc
                .get_first(self.file_name)
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if name.is_empty() {
                continue;
            }
            return Some(SuggestInput {
                key: name.to_lowercase(),
                weight: 1,
                payload: Some(name.to_string()),
            });
        }
    }
}

/// Merges inputs with equal keys.
///
/// The inner inputs are sorted by key bytes (stably, so the first-seen input
/// of a key stays first). Inputs sharing a key collapse into one that keeps
/// the first payload and combines the weights with the merge function.
pub struct UniqueInputIterator<F> {
    /// Sorted inputs.
    inputs: Peekable<vec::IntoIter<SuggestInput>>,
    /// Weight merge.
    merge: F,
}

impl<F> UniqueInputIterator<F>
where
    F: Fn(u64, u64) -> u64,
{
    /// Collects and sorts `inner`.
    pub fn new(inner: impl Iterator<Item = SuggestInput>, merge: F) -> Self {
        let mut inputs: Vec<SuggestInput> = inner.collect();
        inputs.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));
        Self {
            inputs: inputs.into_iter().peekable(),
            merge,
        }
    }
}

impl<F> Iterator for UniqueInputIterator<F>
where
    F: Fn(u64, u64) -> u64,
{
    type Item = SuggestInput;

    fn next(&mut self) -> Option<SuggestInput> {
        let mut first = self.inputs.next()?;
        while let Some(next) = self.inputs.next_if(|n| n.key == first.key) {
            first.weight = (self.merge)(first.weight, next.weight);
            if first.payload.is_none() {
                first.payload = next.payload;
            }
        }
        Some(first)
    }
}
