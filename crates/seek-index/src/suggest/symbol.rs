//! Symbol suggestion database: a small Tantivy index with infix lookup.

use std::{fs, path::Path};

use tantivy::{
    Index, IndexReader, Order, ReloadPolicy, TantivyDocument, Term,
    collector::TopDocs,
    query::{BooleanQuery, Occur, Query, RegexQuery, TermQuery},
    schema::{
        Field, IndexRecordOption, NumericOptions, STORED, Schema, TextFieldIndexing, TextOptions,
        Value,
    },
};

use super::{SuggestError, SuggestInput};
use crate::analyzer::{SOURCE_TOKENIZER, register_tokenizers, source_tokens};

/// Name of the fast weight field.
const WEIGHT: &str = "weight";

/// Writer memory budget; symbol databases are small.
const WRITER_HEAP_BYTES: usize = 15_000_000;

/// Fields of the symbol index.
struct SymbolFields {
    /// Tokenized key.
    key: Field,
    /// Text returned to the caller.
    payload: Field,
    /// Ranking weight.
    weight: Field,
}

/// Builds the symbol schema.
fn symbol_schema() -> (Schema, SymbolFields) {
    let mut builder = Schema::builder();
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(SOURCE_TOKENIZER)
        .set_index_option(IndexRecordOption::Basic);
    let key = builder.add_text_field(
        "key",
        TextOptions::default().set_indexing_options(indexing).set_stored(),
    );
    let payload = builder.add_text_field("payload", STORED);
    let weight = builder.add_u64_field(WEIGHT, NumericOptions::default().set_fast().set_stored());
    (builder.build(), SymbolFields {
        key,
        payload,
        weight,
    })
}

/// Infix lookup over symbol texts.
pub struct SymbolDatabase {
    /// Reader over the symbol index.
    reader: IndexReader,
    /// Field handles.
    fields: SymbolFields,
}

impl SymbolDatabase {
    /// Rebuilds the database in `dir` from `inputs`.
    pub fn build(dir: &Path, inputs: impl Iterator<Item = SuggestInput>) -> Result<usize, SuggestError> {
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|e| SuggestError::io(dir, e))?;
        }
        fs::create_dir_all(dir).map_err(|e| SuggestError::io(dir, e))?;

        let (schema, fields) = symbol_schema();
        let index = Index::create_in_dir(dir, schema).map_err(|e| SuggestError::index(&e))?;
        register_tokenizers(&index);
        let mut writer = index
            .writer::<TantivyDocument>(WRITER_HEAP_BYTES)
            .map_err(|e| SuggestError::index(&e))?;

        let mut count = 0;
        for input in inputs {
            let mut doc = TantivyDocument::new();
            doc.add_text(fields.key, &input.key);
            doc.add_text(fields.payload, input.display());
            doc.add_u64(fields.weight, input.weight);
            writer.add_document(doc).map_err(|e| SuggestError::index(&e))?;
            count += 1;
        }
        writer.commit().map_err(|e| SuggestError::index(&e))?;
        writer
            .wait_merging_threads()
            .map_err(|e| SuggestError::index(&e))?;
        Ok(count)
    }

    /// Opens the database in `dir`.
    pub fn open(dir: &Path) -> Result<Self, SuggestError> {
        let index = Index::open_in_dir(dir).map_err(|e| SuggestError::index(&e))?;
        register_tokenizers(&index);
        let (_, fields) = symbol_schema();
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SuggestError::index(&e))?;
        Ok(Self { reader, fields })
    }

    /// Number of symbols.
    pub fn len(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// True if the database has no symbols.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `limit` symbols containing every token of `input`, heaviest first.
    ///
    /// The last token matches as a prefix, all others exactly.
    pub fn lookup(&self, input: &str, limit: usize) -> Result<Vec<String>, SuggestError> {
        let tokens: Vec<String> = source_tokens(input).into_iter().map(|t| t.text).collect();
        let Some((last, rest)) = tokens.split_last() else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = rest
            .iter()
            .map(|token| {
                let query: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(self.fields.key, token),
                    IndexRecordOption::Basic,
                ));
                (Occur::Must, query)
            })
            .collect();
        let prefix = RegexQuery::from_pattern(&format!("{}.*", regex::escape(last)), self.fields.key)
            .map_err(|e| SuggestError::index(&e))?;
        clauses.push((Occur::Must, Box::new(prefix)));
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let top = TopDocs::with_limit(limit).order_by_fast_field::<u64>(WEIGHT, Order::Desc);
        let hits = searcher
            .search(&query, &top)
            .map_err(|e| SuggestError::index(&e))?;

        let mut out = Vec::with_capacity(hits.len());
        for (_, address) in hits {
            let doc: TantivyDocument = searcher.doc(address).map_err(|e| SuggestError::index(&e))?;
            let text = doc
                .get_first(self.fields.payload)
                .and_then(|v| v.as_str())
                .or_else(|| doc.get_first(self.fields.key).and_then(|v| v.as_str()))
                .unwrap_or_default();
            out.push(text.to_string());
        }
        Ok(out)
    }
}
