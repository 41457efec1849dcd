//! Shared access to the on-disk index.
//!
//! One [`IndexHandle`] owns the Tantivy index, its single writer and a
//! manually refreshed reader. Documents are added under the read half of the
//! writer lock so indexing tasks can stage in parallel; deletes and commits take
//! the write half. Readers only see writes after [`IndexHandle::maybe_refresh_blocking`].
//! [`IndexHandle::update_document`] holds a separate lock from the read of the
//! stored version to the replace, so concurrent updates of a file never
//! overwrite each other with stale fields.

use std::{fs, path::Path};

use parking_lot::{Mutex, RwLock};
use tantivy::{
    DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term,
    collector::TopDocs, directory::MmapDirectory, query::TermQuery, schema::IndexRecordOption,
};
use tracing::{debug, warn};

use crate::{analyzer::register_tokenizers, error::IndexError, schema::IndexSchema};

/// Owner of the index, its writer and its reader.
pub struct IndexHandle {
    /// The Tantivy index.
    index: Index,
    /// Schema with field handles.
    schema: IndexSchema,
    /// The single index writer.
    writer: RwLock<IndexWriter>,
    /// Reader refreshed only on demand.
    reader: IndexReader,
    /// Serializes read-modify-replace cycles.
    update_lock: Mutex<()>,
}

impl IndexHandle {
    /// Opens or creates an index at `path`.
    pub fn open(path: &Path, writer_heap_bytes: usize) -> Result<Self, IndexError> {
        let schema = IndexSchema::new();

        fs::create_dir_all(path)?;

        let dir = MmapDirectory::open(path).map_err(|e| {
            let err: tantivy::TantivyError = e.into();
            IndexError::open_index(path.to_path_buf(), &err)
        })?;

        let index = Index::open_or_create(dir, schema.schema().clone())
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;
        register_tokenizers(&index);

        let writer: IndexWriter = index
            .writer(writer_heap_bytes)
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| IndexError::open_index(path.to_path_buf(), &e))?;

        debug!(path = %path.display(), "opened index");

        Ok(Self {
            index,
            schema,
            writer: RwLock::new(writer),
            reader,
            update_lock: Mutex::new(()),
        })
    }

    /// Field handles.
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// The underlying Tantivy index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// A read snapshot; released when dropped.
    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// Reloads the reader so that committed writes become visible.
    pub fn maybe_refresh_blocking(&self) -> Result<(), IndexError> {
        self.reader.reload().map_err(|e| IndexError::read(&e))
    }

    /// Stages a document; it becomes visible after a commit and refresh.
    pub fn add_document(&self, doc: TantivyDocument) -> Result<(), IndexError> {
        self.writer
            .read()
            .add_document(doc)
            .map_err(|e| IndexError::write(&e))?;
        Ok(())
    }

    /// Replaces every document with `file_id` by `doc` and commits.
    pub fn replace_document(&self, file_id: &str, doc: TantivyDocument) -> Result<(), IndexError> {
        let mut writer = self.writer.write();
        writer.delete_term(Term::from_field_text(self.schema.file_id, file_id));
        writer.add_document(doc).map_err(|e| IndexError::write(&e))?;
        writer.commit().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Replaces the document of `file_id` with one derived from its current
    /// stored version, then refreshes the reader.
    ///
    /// `update` receives `None` for a file that is not indexed yet. No other
    /// update runs between the lookup and the commit.
    pub fn update_document<F>(&self, file_id: &str, update: F) -> Result<(), IndexError>
    where
        F: FnOnce(Option<TantivyDocument>) -> Result<TantivyDocument, IndexError>,
    {
        let _guard = self.update_lock.lock();
        self.maybe_refresh_blocking()?;
        let previous = self
            .find_by_file_id(&self.searcher(), file_id)?
            .map(|(_, doc)| doc);
        let doc = update(previous)?;
        self.replace_document(file_id, doc)?;
        self.maybe_refresh_blocking()
    }

    /// Deletes every document with `file_id` and commits.
    pub fn delete_file(&self, file_id: &str) -> Result<(), IndexError> {
        let mut writer = self.writer.write();
        writer.delete_term(Term::from_field_text(self.schema.file_id, file_id));
        writer.commit().map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Commits all staged changes.
    pub fn commit(&self) -> Result<(), IndexError> {
        self.writer
            .write()
            .commit()
            .map_err(|e| IndexError::commit(&e))?;
        Ok(())
    }

    /// Looks up the stored document for `file_id` in `searcher`.
    pub fn find_by_file_id(
        &self,
        searcher: &Searcher,
        file_id: &str,
    ) -> Result<Option<(DocAddress, TantivyDocument)>, IndexError> {
        let query = TermQuery::new(
            Term::from_field_text(self.schema.file_id, file_id),
            IndexRecordOption::Basic,
        );
        let hits = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(|e| IndexError::read(&e))?;
        match hits.first() {
            Some((_, address)) => {
                let doc = searcher
                    .doc::<TantivyDocument>(*address)
                    .map_err(|e| IndexError::read(&e))?;
                Ok(Some((*address, doc)))
            }
            None => Ok(None),
        }
    }

    /// Number of live documents visible to the current reader.
    pub fn num_docs(&self) -> u64 {
        self.searcher().num_docs()
    }

    /// Waits for background merges and releases the writer.
    ///
    /// Failures are logged; closing is best effort.
    pub fn close(self) {
        let writer = self.writer.into_inner();
        if let Err(e) = writer.wait_merging_threads() {
            warn!(error = %e, "failed to finish index merges on close");
        }
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use tempfile::TempDir;

    use super::*;
    use crate::{document::FileDocument, tags::Tags};

    const HEAP: usize = 15_000_000;

    fn doc(handle: &IndexHandle, id: &str, content: &str) -> TantivyDocument {
        FileDocument::new(id, format!("/src/{id}.c"), "text/x-c", content, Tags::new())
            .to_tantivy(handle.schema())
            .unwrap()
    }

    #[test]
    fn creates_index_in_empty_directory() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open(temp.path(), HEAP).unwrap();
        assert!(temp.path().join("meta.json").exists());
        assert_eq!(handle.num_docs(), 0);
    }

    #[test]
    fn writes_are_invisible_until_refresh() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open(temp.path(), HEAP).unwrap();

        handle.add_document(doc(&handle, "a", "alpha")).unwrap();
        handle.commit().unwrap();
        assert_eq!(handle.num_docs(), 0);

        handle.maybe_refresh_blocking().unwrap();
        assert_eq!(handle.num_docs(), 1);
    }

    #[test]
    fn replace_keeps_one_document_per_file() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open(temp.path(), HEAP).unwrap();

        handle.replace_document("a", doc(&handle, "a", "first")).unwrap();
        handle.replace_document("a", doc(&handle, "a", "second")).unwrap();
        handle.maybe_refresh_blocking().unwrap();

        assert_eq!(handle.num_docs(), 1);
        let searcher = handle.searcher();
        let (_, stored) = handle.find_by_file_id(&searcher, "a").unwrap().unwrap();
        let restored = FileDocument::from_stored(handle.schema(), &stored).unwrap();
        assert_eq!(restored.content, "second");
    }

    #[test]
    fn delete_and_lookup_missing() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open(temp.path(), HEAP).unwrap();

        handle.replace_document("a", doc(&handle, "a", "alpha")).unwrap();
        handle.delete_file("a").unwrap();
        handle.maybe_refresh_blocking().unwrap();

        let searcher = handle.searcher();
        assert!(handle.find_by_file_id(&searcher, "a").unwrap().is_none());
        handle.close();
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let temp = TempDir::new().unwrap();
        let handle = Arc::new(IndexHandle::open(temp.path(), HEAP).unwrap());
        handle.replace_document("a", doc(&handle, "a", "alpha")).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let handle = Arc::clone(&handle);
                thread::spawn(move || {
                    for round in 0..5 {
                        handle
                            .update_document("a", |previous| {
                                let mut file =
                                    FileDocument::from_stored(handle.schema(), &previous.unwrap())?;
                                file.labels.push(format!("w{worker}-{round}"));
                                Ok(file.to_tantivy(handle.schema())?)
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let searcher = handle.searcher();
        let (_, stored) = handle.find_by_file_id(&searcher, "a").unwrap().unwrap();
        let file = FileDocument::from_stored(handle.schema(), &stored).unwrap();
        assert_eq!(file.labels.len(), 20);
        assert_eq!(handle.num_docs(), 1);
    }

    #[test]
    fn update_of_missing_file_sees_nothing() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open(temp.path(), HEAP).unwrap();
        handle
            .update_document("a", |previous| {
                assert!(previous.is_none());
                Ok(doc(&handle, "a", "alpha"))
            })
            .unwrap();
        assert_eq!(handle.num_docs(), 1);
    }

    #[test]
    fn reopen_sees_committed_documents() {
        let temp = TempDir::new().unwrap();
        {
            let handle = IndexHandle::open(temp.path(), HEAP).unwrap();
            handle.replace_document("a", doc(&handle, "a", "alpha")).unwrap();
            handle.close();
        }
        let handle = IndexHandle::open(temp.path(), HEAP).unwrap();
        assert_eq!(handle.num_docs(), 1);
    }
}
