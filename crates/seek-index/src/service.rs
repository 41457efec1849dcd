//! The search service.
//!
//! A [`Service`] owns the index handle, the matching and indexing pools and
//! the suggestion handler for one index directory. Every operation is a
//! method; [`Service::handle`] dispatches a serialized [`Request`] to them and
//! turns the outcome into a [`Response`], so a transport only has to move
//! JSON.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use seek_config::Config;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    document::FileDocument,
    error::IndexError,
    handle::IndexHandle,
    pool::HandoffPool,
    search::{SearchExecutor, SearchOptions, SearchRequest, SearchResults},
    suggest::{BuildReport, DatabaseBuilder, SuggestionDatabase, SuggestionHandler},
    tag_source::{NoTags, TagSource},
};

/// Fields [`Service::add_field_values`] may change.
pub const PATCHABLE_FIELDS: &[&str] = &["labels", "boost"];

/// A file to (re)index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFileRequest {
    /// Caller-assigned identifier; replaces any document with the same id.
    pub file_id: String,
    /// File to read.
    pub file_path: PathBuf,
    /// MIME type recorded with the document.
    #[serde(default)]
    pub mime_type: String,
}

/// Index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Live documents visible to searches.
    pub document_count: u64,
}

/// A service operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Run a search.
    Search(SearchRequest),
    /// Autocomplete a file name or symbol.
    Suggest {
        /// Text typed so far.
        query: String,
        /// `SEARCH_FOR_FILE_NAME` selects file names, anything else symbols.
        #[serde(default)]
        options: SearchOptions,
        /// Maximum suggestions; the configured default when absent.
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Index a file in the background.
    IndexFile(IndexFileRequest),
    /// Patch stored fields of an indexed file.
    AddFieldValues {
        /// File to patch.
        file_id: String,
        /// Values per field name.
        values: BTreeMap<String, Vec<String>>,
    },
    /// Rebuild the suggestion databases.
    BuildSuggestions,
    /// Report index statistics.
    Statistics,
    /// Stop accepting requests.
    Stop,
}

/// Outcome of a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Search results.
    Search(SearchResults),
    /// Suggestions, best first.
    Suggestions {
        /// Suggested texts.
        suggestions: Vec<String>,
    },
    /// The request was queued or applied.
    Ok,
    /// Suggestion databases were rebuilt.
    Built(BuildReport),
    /// Index statistics.
    Statistics(Statistics),
    /// The service no longer accepts requests.
    Stopped,
    /// The request failed.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

/// Search, indexing and suggestion operations over one index.
pub struct Service {
    /// Effective configuration.
    config: Config,
    /// Shared with indexing tasks.
    handle: Arc<IndexHandle>,
    /// Search execution.
    executor: SearchExecutor,
    /// Runs background indexing.
    indexing: HandoffPool,
    /// Serves suggestions.
    suggestions: SuggestionHandler,
    /// Resolves tags of indexed files.
    tag_source: Arc<dyn TagSource>,
    /// Cleared by [`stop`](Self::stop).
    running: AtomicBool,
}

impl Service {
    /// Opens the index and suggestion databases named by `config`.
    pub fn open(config: Config) -> Result<Self, IndexError> {
        let handle = IndexHandle::open(&config.index_dir, config.search.writer_heap_bytes)?;
        let keep_alive = Duration::from_secs(config.pool.keep_alive_secs);
        let executor = SearchExecutor::new(
            Arc::new(HandoffPool::new("seek-match", keep_alive)),
            config.search.clone(),
            config.log.clone(),
        );
        let suggestions = SuggestionHandler::load(&config.suggest_dir(), config.suggest.fuzzy_distance);
        info!(index_dir = %config.index_dir.display(), documents = handle.num_docs(), "service ready");

        Ok(Self {
            handle: Arc::new(handle),
            executor,
            indexing: HandoffPool::new("seek-index", keep_alive),
            suggestions,
            tag_source: Arc::new(NoTags),
            running: AtomicBool::new(true),
            config,
        })
    }

    /// Uses `source` for the tags of files indexed from now on.
    pub fn with_tag_source(mut self, source: impl TagSource + 'static) -> Self {
        self.tag_source = Arc::new(source);
        self
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs a search against the current snapshot.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResults, IndexError> {
        self.executor.execute(&self.handle, request)
    }

    /// Suggestions for `input`; file names when `options` asks for them.
    pub fn suggest(&self, input: &str, options: SearchOptions, limit: Option<usize>) -> Vec<String> {
        let database = if options.contains(SearchOptions::SEARCH_FOR_FILE_NAME) {
            SuggestionDatabase::FileName
        } else {
            SuggestionDatabase::Symbol
        };
        let limit = limit.unwrap_or(self.config.suggest.default_limit);
        self.suggestions.suggest(database, input, limit)
    }

    /// Indexes a file on the indexing pool; failures are logged.
    pub fn index_file(&self, request: IndexFileRequest) -> Result<(), IndexError> {
        let handle = Arc::clone(&self.handle);
        let tag_source = Arc::clone(&self.tag_source);
        self.indexing.submit(move || {
            if let Err(e) = index_one(&handle, tag_source.as_ref(), &request) {
                warn!(file_id = %request.file_id, path = %request.file_path.display(), error = %e, "indexing failed");
            }
        })?;
        Ok(())
    }

    /// Indexes a file on the calling thread.
    ///
    /// Labels and boost of a previously indexed version are kept.
    pub fn index_file_blocking(&self, request: &IndexFileRequest) -> Result<(), IndexError> {
        index_one(&self.handle, self.tag_source.as_ref(), request)
    }

    /// Adds labels to, or sets the boost of, an indexed file.
    ///
    /// Only the fields in [`PATCHABLE_FIELDS`] are accepted. `boost` takes
    /// the last of its values.
    pub fn add_field_values(
        &self,
        file_id: &str,
        values: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), IndexError> {
        let schema = self.handle.schema();
        self.handle.update_document(file_id, |stored| {
            let stored = stored.ok_or_else(|| IndexError::NotFound(file_id.to_string()))?;
            let mut file = FileDocument::from_stored(schema, &stored)?;
            apply_field_values(&mut file, values)?;
            Ok(file.to_tantivy(schema)?)
        })?;
        debug!(file_id, "patched fields");
        Ok(())
    }

    /// Rebuilds both suggestion databases and reloads them.
    pub fn build_suggestions(&self) -> Result<BuildReport, IndexError> {
        let report = DatabaseBuilder::new(&self.handle, &self.config.suggest_dir()).build_all()?;
        self.suggestions.reload();
        Ok(report)
    }

    /// Current statistics.
    pub fn statistics(&self) -> Result<Statistics, IndexError> {
        self.handle.maybe_refresh_blocking()?;
        Ok(Statistics {
            document_count: self.handle.num_docs(),
        })
    }

    /// Stops accepting new requests.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("service stopping");
        }
    }

    /// False once [`stop`](Self::stop) was called.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs one request.
    ///
    /// Request errors are reported in the response; other failures are
    /// logged as well.
    pub fn handle(&self, request: Request) -> Response {
        let result = match request {
            Request::Search(search) => self.search(&search).map(Response::Search),
            Request::Suggest {
                query,
                options,
                limit,
            } => Ok(Response::Suggestions {
                suggestions: self.suggest(&query, options, limit),
            }),
            Request::IndexFile(file) => self.index_file(file).map(|()| Response::Ok),
            Request::AddFieldValues { file_id, values } => self
                .add_field_values(&file_id, &values)
                .map(|()| Response::Ok),
            Request::BuildSuggestions => self.build_suggestions().map(Response::Built),
            Request::Statistics => self.statistics().map(Response::Statistics),
            Request::Stop => {
                self.stop();
                Ok(Response::Stopped)
            }
        };
        result.unwrap_or_else(|e| {
            if !e.is_request_error() {
                warn!(error = %e, "request failed");
            }
            Response::Error {
                message: e.to_string(),
            }
        })
    }

    /// Releases the index; pending background indexing may still hold it.
    pub fn close(self) {
        match Arc::try_unwrap(self.handle) {
            Ok(handle) => handle.close(),
            Err(_) => warn!("index still in use by indexing tasks; skipping merge wait"),
        }
        info!("service closed");
    }
}

/// Reads, tags and (re)indexes one file, then makes it visible.
fn index_one(
    handle: &IndexHandle,
    tag_source: &dyn TagSource,
    request: &IndexFileRequest,
) -> Result<(), IndexError> {
    let path: &Path = &request.file_path;
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let tags = tag_source.tags(path, &content)?;

    let mut file = FileDocument::new(
        request.file_id.as_str(),
        path.to_string_lossy(),
        request.mime_type.as_str(),
        content,
        tags,
    );

    handle.update_document(&request.file_id, |stored| {
        if let Some(stored) = stored {
            match FileDocument::from_stored(handle.schema(), &stored) {
                Ok(previous) => {
                    file.boost = previous.boost;
                    file.labels = previous.labels;
                }
                Err(e) => warn!(file_id = %request.file_id, error = %e, "dropping unreadable previous version"),
            }
        }
        Ok(file.to_tantivy(handle.schema())?)
    })?;
    debug!(file_id = %request.file_id, path = %path.display(), "indexed");
    Ok(())
}

/// Applies patch values to `file`; see [`Service::add_field_values`].
fn apply_field_values(
    file: &mut FileDocument,
    values: &BTreeMap<String, Vec<String>>,
) -> Result<(), IndexError> {
    for (field, field_values) in values {
        match field.as_str() {
            "labels" => {
                for label in field_values {
                    if !file.labels.contains(label) {
                        file.labels.push(label.clone());
                    }
                }
            }
            "boost" => {
                if let Some(value) = field_values.last() {
                    file.boost = value.trim().parse().map_err(|_| IndexError::InvalidFieldValue {
                        field: field.clone(),
                        value: value.clone(),
                    })?;
                }
            }
            _ => return Err(IndexError::UnpatchableField(field.clone())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Instant};

    use tempfile::TempDir;

    use super::*;
    use crate::{location::Location, tag_source::CtagsJsonSource};

    struct Fixture {
        temp: TempDir,
        service: Service,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let mut config = Config::with_index_dir(temp.path().join("index"));
            config.search.writer_heap_bytes = 15_000_000;
            config.pool.keep_alive_secs = 1;
            let service = Service::open(config).unwrap().with_tag_source(CtagsJsonSource);
            Self { temp, service }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.temp.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn index(&self, id: &str, path: PathBuf) {
            self.service
                .index_file_blocking(&IndexFileRequest {
                    file_id: id.into(),
                    file_path: path,
                    mime_type: "text/x-c".into(),
                })
                .unwrap();
        }
    }

    fn values(field: &str, items: &[&str]) -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([(
            field.to_string(),
            items.iter().map(|s| s.to_string()).collect(),
        )])
    }

    #[test]
    fn tag_search_end_to_end() {
        let fx = Fixture::new();
        let path = fx.write("x.c", "int x;\nx = 3;\n");
        fs::write(
            CtagsJsonSource::sidecar(&path),
            r#"{"_type": "tag", "name": "x", "line": 1, "kind": "variable"}"#,
        )
        .unwrap();
        fx.index("1", path);

        let results = fx
            .service
            .search(&SearchRequest::new("kind:variable", SearchOptions::SEARCH_IN_DEFS))
            .unwrap();
        assert_eq!(results.total_hits, 1);
        assert_eq!(results.files[0].matches.len(), 1);
        assert_eq!(results.files[0].matches[0].location, Location::new(1, 5, 5).unwrap());
    }

    #[test]
    fn short_log_query_has_no_matches() {
        let fx = Fixture::new();
        fx.index("1", fx.write("app.log", "disk full\n"));
        let response = fx.service.handle(Request::Search(SearchRequest::new(
            "disk",
            SearchOptions::FIND_LOG_TEXT,
        )));
        assert_eq!(response, Response::Search(SearchResults::default()));
    }

    #[test]
    fn background_indexing_becomes_visible() {
        let fx = Fixture::new();
        let path = fx.write("a.c", "int main;\n");
        fx.service
            .index_file(IndexFileRequest {
                file_id: "a".into(),
                file_path: path,
                mime_type: String::new(),
            })
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while fx.service.statistics().unwrap().document_count == 0 {
            assert!(Instant::now() < deadline, "file never became visible");
            thread::sleep(Duration::from_millis(20));
        }
        let results = fx
            .service
            .search(&SearchRequest::new("main", SearchOptions::SEARCH_IN_SOURCE))
            .unwrap();
        assert_eq!(results.files[0].file_id, "a");
    }

    #[test]
    fn patch_labels_and_boost() {
        let fx = Fixture::new();
        let path = fx.write("a.c", "int a;\n");
        fx.index("a", path.clone());

        fx.service
            .add_field_values("a", &values("labels", &["core"]))
            .unwrap();
        fx.service.add_field_values("a", &values("boost", &["2.5"])).unwrap();

        let results = fx
            .service
            .search(&SearchRequest::new("labels:core", SearchOptions::SEARCH_IN_SOURCE))
            .unwrap();
        assert_eq!(results.total_hits, 1);

        // Reindexing keeps the patched values.
        fx.index("a", path);
        assert_eq!(fx.service.statistics().unwrap().document_count, 1);
        let searcher = fx.service.handle.searcher();
        let (_, stored) = fx.service.handle.find_by_file_id(&searcher, "a").unwrap().unwrap();
        let file = FileDocument::from_stored(fx.service.handle.schema(), &stored).unwrap();
        assert_eq!(file.labels, vec!["core"]);
        assert_eq!(file.boost, 2.5);
    }

    #[test]
    fn reindexing_keeps_concurrent_patches() {
        let fx = Fixture::new();
        let path = fx.write("a.c", "int a;\n");
        fx.index("a", path.clone());

        thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..10 {
                    fx.index("a", path.clone());
                }
            });
            scope.spawn(|| {
                for round in 0..10 {
                    let label = format!("l{round}");
                    fx.service
                        .add_field_values("a", &values("labels", &[label.as_str()]))
                        .unwrap();
                }
            });
        });

        let searcher = fx.service.handle.searcher();
        let (_, stored) = fx.service.handle.find_by_file_id(&searcher, "a").unwrap().unwrap();
        let file = FileDocument::from_stored(fx.service.handle.schema(), &stored).unwrap();
        assert_eq!(file.labels.len(), 10);
        assert_eq!(fx.service.statistics().unwrap().document_count, 1);
    }

    #[test]
    fn tags_inside_longer_identifiers_are_not_misplaced() {
        let fx = Fixture::new();
        let path = fx.write("n.c", "int n;\nn = 3;\n");
        fs::write(
            CtagsJsonSource::sidecar(&path),
            r#"{"_type": "tag", "name": "n", "line": 1, "kind": "variable"}"#,
        )
        .unwrap();
        fx.index("1", path);

        let path = fx.write("foo.cc", "Foo::~Foo() {}\n");
        fs::write(
            CtagsJsonSource::sidecar(&path),
            r#"{"_type": "tag", "name": "~Foo", "line": 1, "kind": "function"}"#,
        )
        .unwrap();
        fx.index("2", path);

        let locations = |query: &str| -> Vec<String> {
            let results = fx
                .service
                .search(&SearchRequest::new(query, SearchOptions::SEARCH_IN_DEFS))
                .unwrap();
            assert_eq!(results.total_hits, 1);
            results.files[0]
                .matches
                .iter()
                .map(|m| m.location.to_string())
                .collect()
        };
        assert_eq!(locations("kind:variable"), vec!["1:5-5"]);
        assert_eq!(locations("kind:function"), vec!["1:6-9"]);
    }

    #[test]
    fn patch_errors() {
        let fx = Fixture::new();
        fx.index("a", fx.write("a.c", "int a;\n"));

        let err = fx.service.add_field_values("b", &values("labels", &["x"])).unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));

        let err = fx.service.add_field_values("a", &values("content", &["x"])).unwrap_err();
        assert!(matches!(err, IndexError::UnpatchableField(field) if field == "content"));

        let err = fx.service.add_field_values("a", &values("boost", &["high"])).unwrap_err();
        assert!(matches!(err, IndexError::InvalidFieldValue { .. }));
    }

    #[test]
    fn suggestions_after_build() {
        let fx = Fixture::new();
        fx.index("1", fx.write("main.c", "int main;\n"));
        assert!(fx.service.suggest("mai", SearchOptions::SEARCH_FOR_FILE_NAME, None).is_empty());

        let report = fx.service.build_suggestions().unwrap();
        assert_eq!(report.file_names, 1);
        assert_eq!(
            fx.service.suggest("mai", SearchOptions::SEARCH_FOR_FILE_NAME, None),
            vec!["main.c"]
        );
    }

    #[test]
    fn json_dispatch() {
        let fx = Fixture::new();
        let request: Request = serde_json::from_str(r#"{"op": "statistics"}"#).unwrap();
        let response = fx.service.handle(request);
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"type":"statistics","document_count":0}"#
        );

        let request: Request =
            serde_json::from_str(r#"{"op": "search", "query": "(", "options": 1}"#).unwrap();
        assert!(matches!(fx.service.handle(request), Response::Error { .. }));

        let request: Request = serde_json::from_str(r#"{"op": "stop"}"#).unwrap();
        assert_eq!(fx.service.handle(request), Response::Stopped);
        assert!(!fx.service.is_running());
    }

    #[test]
    fn close_releases_index() {
        let fx = Fixture::new();
        fx.index("1", fx.write("a.c", "a\n"));
        let Fixture { temp, service } = fx;
        service.close();
        drop(temp);
    }
}
