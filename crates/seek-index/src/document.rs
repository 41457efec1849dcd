//! Conversion between indexed files and Tantivy documents.

use tantivy::{
    TantivyDocument,
    schema::{Field, Value},
};

use crate::{
    error::IndexError,
    schema::IndexSchema,
    tags::{TagsError, Tags},
};

/// Boost applied to files that were never patched.
pub const DEFAULT_BOOST: f64 = 1.0;

/// A source file as stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDocument {
    /// Caller-assigned identifier.
    pub file_id: String,
    /// Path with `/` separators.
    pub path: String,
    /// MIME type reported by the caller.
    pub mime_type: String,
    /// File text.
    pub content: String,
    /// Tags of the file.
    pub tags: Tags,
    /// Score multiplier for general and tag search.
    pub boost: f64,
    /// Caller-provided labels.
    pub labels: Vec<String>,
}

impl FileDocument {
    /// Creates a document with default boost and no labels.
    pub fn new(
        file_id: impl Into<String>,
        path: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<String>,
        tags: Tags,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            path: normalize_path(&path.into()),
            mime_type: mime_type.into(),
            content: content.into(),
            tags,
            boost: DEFAULT_BOOST,
            labels: Vec::new(),
        }
    }

    /// Directory part of the path, empty for bare file names.
    pub fn dir_path(&self) -> &str {
        split_path(&self.path).0
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        split_path(&self.path).1
    }

    /// Builds the Tantivy document.
    pub fn to_tantivy(&self, schema: &IndexSchema) -> Result<TantivyDocument, TagsError> {
        let mut doc = TantivyDocument::new();
        doc.add_text(schema.file_id, &self.file_id);
        doc.add_text(schema.path, &self.path);
        doc.add_text(schema.dir_path, self.dir_path());
        doc.add_text(schema.file_name, self.file_name());
        doc.add_text(schema.definitions, definitions_text(&self.tags));
        doc.add_text(schema.tag_kind, tag_kind_text(&self.tags));
        doc.add_bytes(schema.tags, self.tags.to_bytes()?.as_slice());
        doc.add_text(schema.content, &self.content);
        doc.add_text(schema.mime_type, &self.mime_type);
        doc.add_f64(schema.boost, self.boost);
        for label in &self.labels {
            doc.add_text(schema.labels, label);
        }
        Ok(doc)
    }

    /// Reconstructs a document from its stored fields.
    pub fn from_stored(schema: &IndexSchema, doc: &TantivyDocument) -> Result<Self, IndexError> {
        let tags = match doc.get_first(schema.tags).and_then(|v| v.as_bytes()) {
            Some(bytes) => Tags::from_bytes(bytes)?,
            None => Tags::new(),
        };
        Ok(Self {
            file_id: stored_text(doc, schema.file_id).to_string(),
            path: stored_text(doc, schema.path).to_string(),
            mime_type: stored_text(doc, schema.mime_type).to_string(),
            content: stored_text(doc, schema.content).to_string(),
            tags,
            boost: doc
                .get_first(schema.boost)
                .and_then(|v| v.as_f64())
                .unwrap_or(DEFAULT_BOOST),
            labels: doc
                .get_all(schema.labels)
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect(),
        })
    }
}

/// First stored text value of `field`, or the empty string.
pub fn stored_text(doc: &TantivyDocument, field: Field) -> &str {
    doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("")
}

/// Converts backslashes to slashes.
fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Splits a normalized path into directory and file name.
fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Text indexed in the definitions field: one tag text per line.
fn definitions_text(tags: &Tags) -> String {
    let mut texts: Vec<&str> = tags.all_tags().map(|(_, tag)| tag.text.as_str()).collect();
    texts.sort_unstable();
    texts.dedup();
    texts.join("\n")
}

/// Text indexed in the tag kind field: generic then original kinds, one per line.
fn tag_kind_text(tags: &Tags) -> String {
    let mut lines: Vec<&str> = tags.generic_kinds().into_iter().map(|k| k.as_str()).collect();
    lines.extend(tags.original_kinds());
    lines.join("\n")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        location::Location,
        tags::{GenericKind, Tag},
    };

    fn sample_tags() -> Tags {
        let mut tags = Tags::new();
        tags.add(
            4,
            Tag::new(
                GenericKind::Variable,
                Location::new(1, 5, 5).unwrap(),
                "x",
                "local",
            ),
        );
        tags
    }

    #[test]
    fn splits_paths() {
        let doc = FileDocument::new("1", "src\\core\\main.c", "text/x-c", "", Tags::new());
        assert_eq!(doc.path, "src/core/main.c");
        assert_eq!(doc.dir_path(), "src/core");
        assert_eq!(doc.file_name(), "main.c");

        let root = FileDocument::new("2", "/main.c", "", "", Tags::new());
        assert_eq!(root.dir_path(), "/");
        assert_eq!(root.file_name(), "main.c");

        let bare = FileDocument::new("3", "main.c", "", "", Tags::new());
        assert_eq!(bare.dir_path(), "");
        assert_eq!(bare.file_name(), "main.c");
    }

    #[test]
    fn kind_text_lists_generic_then_original() {
        assert_eq!(tag_kind_text(&sample_tags()), "variable\nlocal");
        assert_eq!(definitions_text(&sample_tags()), "x");
    }

    #[test]
    fn stored_round_trip() {
        let schema = IndexSchema::new();
        let mut doc = FileDocument::new(
            "42",
            "/src/a.c",
            "text/x-c",
            "int x;\nx = 3;\n",
            sample_tags(),
        );
        doc.boost = 2.5;
        doc.labels = vec!["core".into(), "hot path".into()];

        let tantivy_doc = doc.to_tantivy(&schema).unwrap();
        let restored = FileDocument::from_stored(&schema, &tantivy_doc).unwrap();
        assert_eq!(restored, doc);
    }
}
