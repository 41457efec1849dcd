//! Index schema definition for the seek search index.
//!
//! One document per source file:
//! - `file_id`: caller-assigned identifier (raw, stored)
//! - `path`: full path (path hierarchy, stored)
//! - `dir_path`, `file_name`: path split for regex filters (raw, stored)
//! - `definitions`: texts of the file's tags (source tokenizer)
//! - `tag_kind`: generic and original tag kinds, one per line
//! - `tags`: encoded tags blob (stored bytes)
//! - `content`: file text (source tokenizer with positions, stored)
//! - `mime_type`: (raw, stored)
//! - `boost`: per-file score multiplier (f64, fast, stored)
//! - `labels`: caller-provided labels (source tokenizer, stored)

use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, TextFieldIndexing,
    TextOptions,
};

use crate::analyzer::tokenizer_for;

/// Field names.
pub mod fields {
    /// Caller-assigned file identifier.
    pub const FILE_ID: &str = "file_id";
    /// Full file path.
    pub const PATH: &str = "path";
    /// Directory part of the path.
    pub const DIR_PATH: &str = "dir_path";
    /// Final path component.
    pub const FILE_NAME: &str = "file_name";
    /// Tag texts.
    pub const DEFINITIONS: &str = "definitions";
    /// Tag kinds.
    pub const TAG_KIND: &str = "tag_kind";
    /// Encoded tags blob.
    pub const TAGS: &str = "tags";
    /// File text.
    pub const CONTENT: &str = "content";
    /// MIME type reported by the caller.
    pub const MIME_TYPE: &str = "mime_type";
    /// Score multiplier.
    pub const BOOST: &str = "boost";
    /// Caller-provided labels.
    pub const LABELS: &str = "labels";
}

/// Handles to all fields in the index schema.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    /// The underlying Tantivy schema.
    schema: Schema,
    /// Caller-assigned file identifier.
    pub file_id: Field,
    /// Full file path.
    pub path: Field,
    /// Directory part of the path.
    pub dir_path: Field,
    /// Final path component.
    pub file_name: Field,
    /// Tag texts.
    pub definitions: Field,
    /// Tag kinds.
    pub tag_kind: Field,
    /// Encoded tags blob.
    pub tags: Field,
    /// File text.
    pub content: Field,
    /// MIME type.
    pub mime_type: Field,
    /// Score multiplier.
    pub boost: Field,
    /// Caller-provided labels.
    pub labels: Field,
}

impl IndexSchema {
    /// Creates a new index schema with all fields configured.
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let file_id = builder.add_text_field(fields::FILE_ID, STRING | STORED);
        let path = builder.add_text_field(fields::PATH, analyzed(fields::PATH, true, false));
        let dir_path = builder.add_text_field(fields::DIR_PATH, STRING | STORED);
        let file_name = builder.add_text_field(fields::FILE_NAME, STRING | STORED);
        let definitions = builder.add_text_field(
            fields::DEFINITIONS,
            analyzed(fields::DEFINITIONS, false, false),
        );
        let tag_kind =
            builder.add_text_field(fields::TAG_KIND, analyzed(fields::TAG_KIND, false, false));
        let tags = builder.add_bytes_field(fields::TAGS, STORED);
        let content =
            builder.add_text_field(fields::CONTENT, analyzed(fields::CONTENT, true, true));
        let mime_type = builder.add_text_field(fields::MIME_TYPE, STRING | STORED);
        let boost = builder.add_f64_field(
            fields::BOOST,
            NumericOptions::default().set_fast().set_stored().set_indexed(),
        );
        let labels = builder.add_text_field(fields::LABELS, analyzed(fields::LABELS, true, true));

        Self {
            schema: builder.build(),
            file_id,
            path,
            dir_path,
            file_name,
            definitions,
            tag_kind,
            tags,
            content,
            mime_type,
            boost,
            labels,
        }
    }

    /// Returns a reference to the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Text options for an analyzed field, using its tokenizer from the field table.
fn analyzed(field: &str, stored: bool, positions: bool) -> TextOptions {
    let record = if positions {
        IndexRecordOption::WithFreqsAndPositions
    } else {
        IndexRecordOption::WithFreqs
    };
    let mut indexing = TextFieldIndexing::default().set_index_option(record);
    if let Some(tokenizer) = tokenizer_for(field) {
        indexing = indexing.set_tokenizer(tokenizer);
    }
    let options = TextOptions::default().set_indexing_options(indexing);
    if stored { options.set_stored() } else { options }
}

#[cfg(test)]
mod test {
    use tantivy::schema::FieldType;

    use super::*;

    #[test]
    fn all_fields_present() {
        let schema = IndexSchema::new();
        for name in [
            fields::FILE_ID,
            fields::PATH,
            fields::DIR_PATH,
            fields::FILE_NAME,
            fields::DEFINITIONS,
            fields::TAG_KIND,
            fields::TAGS,
            fields::CONTENT,
            fields::MIME_TYPE,
            fields::BOOST,
            fields::LABELS,
        ] {
            assert!(schema.schema().get_field(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn tokenizers_follow_field_table() {
        let schema = IndexSchema::new();
        let tokenizer = |field: Field| match schema.schema().get_field_entry(field).field_type() {
            FieldType::Str(options) => options
                .get_indexing_options()
                .map(|indexing| indexing.tokenizer().to_string()),
            _ => None,
        };

        assert_eq!(tokenizer(schema.content).as_deref(), Some("seek_source"));
        assert_eq!(tokenizer(schema.path).as_deref(), Some("seek_path"));
        assert_eq!(tokenizer(schema.tag_kind).as_deref(), Some("seek_tag_kind"));
        assert_eq!(tokenizer(schema.file_name).as_deref(), Some("raw"));
    }

    #[test]
    fn content_is_stored_with_positions() {
        let schema = IndexSchema::new();
        let entry = schema.schema().get_field_entry(schema.content);
        assert!(entry.is_stored());
        match entry.field_type() {
            FieldType::Str(options) => {
                let indexing = options.get_indexing_options().unwrap();
                assert_eq!(
                    indexing.index_option(),
                    IndexRecordOption::WithFreqsAndPositions
                );
            }
            other => panic!("unexpected field type {other:?}"),
        }
    }

    #[test]
    fn boost_is_fast() {
        let schema = IndexSchema::new();
        assert!(schema.schema().get_field_entry(schema.boost).is_fast());
        assert!(
            !schema
                .schema()
                .get_field_entry(schema.definitions)
                .is_stored()
        );
    }
}
