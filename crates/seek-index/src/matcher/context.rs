//! Per-document matching context.

use std::sync::Arc;

use tantivy::{DocAddress, SegmentId, Searcher, TantivyDocument, schema::Value};

use crate::{
    document::stored_text,
    error::IndexError,
    location::LineInformations,
    query::QueryContext,
    schema::IndexSchema,
    tags::{Tags, TagsError},
};

/// Everything a matcher needs to know about one retrieved document.
///
/// Built once per hit from the request's searcher snapshot and shared
/// read-only by the matchers.
#[derive(Debug)]
pub struct Context {
    /// The request's sub-queries and matcher data.
    pub query: Arc<QueryContext>,
    /// Address of the document in the snapshot.
    pub address: DocAddress,
    /// Segment holding the document.
    pub segment_id: SegmentId,
    /// Stored fields.
    document: TantivyDocument,
    /// Field handles.
    schema: IndexSchema,
    /// Original file text.
    content: String,
    /// Line table over `content`.
    lines: LineInformations,
}

impl Context {
    /// Loads the stored fields of `address`.
    pub fn load(
        searcher: &Searcher,
        schema: &IndexSchema,
        query: Arc<QueryContext>,
        address: DocAddress,
    ) -> Result<Self, IndexError> {
        let document: TantivyDocument = searcher.doc(address).map_err(|e| IndexError::read(&e))?;
        let segment_id = searcher.segment_reader(address.segment_ord).segment_id();
        Ok(Self::from_document(query, address, segment_id, schema, document))
    }

    /// Wraps an already loaded document.
    pub fn from_document(
        query: Arc<QueryContext>,
        address: DocAddress,
        segment_id: SegmentId,
        schema: &IndexSchema,
        document: TantivyDocument,
    ) -> Self {
        let content = stored_text(&document, schema.content).to_string();
        let lines = LineInformations::from_content(&content);
        Self {
            query,
            address,
            segment_id,
            document,
            schema: schema.clone(),
            content,
            lines,
        }
    }

    /// Original file text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Line table of the content.
    pub fn lines(&self) -> &LineInformations {
        &self.lines
    }

    /// Stored path.
    pub fn file_path(&self) -> &str {
        stored_text(&self.document, self.schema.path)
    }

    /// Stored file name.
    pub fn file_name(&self) -> &str {
        stored_text(&self.document, self.schema.file_name)
    }

    /// Caller-assigned file id.
    pub fn file_id(&self) -> &str {
        stored_text(&self.document, self.schema.file_id)
    }

    /// Decodes the document's tags; a document without a blob has no tags.
    pub fn tags(&self) -> Result<Tags, TagsError> {
        match self.document.get_first(self.schema.tags).and_then(|v| v.as_bytes()) {
            Some(bytes) => Tags::from_bytes(bytes),
            None => Ok(Tags::new()),
        }
    }
}
