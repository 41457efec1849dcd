//! Rebuilding the suggestion databases from the index.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    FileNameDatabase, FileNameInputIterator, SuggestionDatabase, SymbolDatabase,
    TagInputIterator, UniqueInputIterator,
};
use crate::{error::IndexError, handle::IndexHandle};

/// Entry counts of a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    /// Distinct file names.
    pub file_names: usize,
    /// Distinct symbols.
    pub symbols: usize,
}

/// Rebuilds both databases from the latest committed index state.
pub struct DatabaseBuilder<'a> {
    /// Source index.
    handle: &'a IndexHandle,
    /// Directory holding both databases.
    suggest_dir: PathBuf,
}

impl<'a> DatabaseBuilder<'a> {
    /// Creates a builder writing below `suggest_dir`.
    pub fn new(handle: &'a IndexHandle, suggest_dir: &Path) -> Self {
        Self {
            handle,
            suggest_dir: suggest_dir.to_path_buf(),
        }
    }

    /// Refreshes the reader, then replaces both databases.
    ///
    /// File names that occur more than once are weighted by their count;
    /// symbols keep the weight of their heaviest kind.
    pub fn build_all(&self) -> Result<BuildReport, IndexError> {
        self.handle.maybe_refresh_blocking()?;
        let searcher = self.handle.searcher();
        let schema = self.handle.schema();

        let path = SuggestionDatabase::FileName.path(&self.suggest_dir);
        let file_names = FileNameDatabase::build(
            &path,
            UniqueInputIterator::new(
                FileNameInputIterator::new(searcher.clone(), schema.file_name),
                u64::saturating_add,
            ),
        )?;
        log_built(SuggestionDatabase::FileName, file_names);

        let path = SuggestionDatabase::Symbol.path(&self.suggest_dir);
        let symbols = SymbolDatabase::build(
            &path,
            UniqueInputIterator::new(TagInputIterator::new(searcher, schema.tags), u64::max),
        )?;
        log_built(SuggestionDatabase::Symbol, symbols);

        Ok(BuildReport {
            file_names,
            symbols,
        })
    }
}

/// Logs the size of a rebuilt database.
fn log_built(database: SuggestionDatabase, entries: usize) {
    if entries == 0 {
        info!(%database, "suggestion database is empty");
    } else {
        info!(%database, entries, "rebuilt suggestion database");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::{
        document::FileDocument,
        location::Location,
        suggest::SuggestionHandler,
        tags::{GenericKind, Tag, Tags},
    };

    fn tags(entries: &[(GenericKind, &str)]) -> Tags {
        let mut tags = Tags::new();
        for (offset, (kind, text)) in entries.iter().enumerate() {
            tags.add(offset * 10, Tag::new(*kind, Location::new(1, 1, 1).unwrap(), *text, ""));
        }
        tags
    }

    #[test]
    fn builds_and_serves_both_databases() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open(&temp.path().join("index"), 15_000_000).unwrap();
        for (id, path, file_tags) in [
            ("1", "/src/main.rs", tags(&[(GenericKind::Type, "Foo"), (GenericKind::Function, "run")])),
            ("2", "/src/lib.rs", tags(&[(GenericKind::Variable, "Foo")])),
            ("3", "/test/main.rs", Tags::new()),
        ] {
            let doc = FileDocument::new(id, path, "text/x-rust", "", file_tags)
                .to_tantivy(handle.schema())
                .unwrap();
            handle.add_document(doc).unwrap();
        }
        handle.commit().unwrap();

        let suggest_dir = temp.path().join("suggest");
        let report = DatabaseBuilder::new(&handle, &suggest_dir).build_all().unwrap();
        assert_eq!(report, BuildReport {
            file_names: 2,
            symbols: 2,
        });

        let handler = SuggestionHandler::load(&suggest_dir, 1);
        assert_eq!(
            handler.suggest(SuggestionDatabase::FileName, "mian", 10),
            vec!["main.rs"]
        );
        assert_eq!(
            handler.suggest(SuggestionDatabase::Symbol, "", 10),
            Vec::<String>::new()
        );
        assert_eq!(
            handler.suggest(SuggestionDatabase::Symbol, "f", 10),
            vec!["Foo"]
        );
    }

    #[test]
    fn empty_index_builds_empty_databases() {
        let temp = TempDir::new().unwrap();
        let handle = IndexHandle::open(&temp.path().join("index"), 15_000_000).unwrap();
        let suggest_dir = temp.path().join("suggest");
        let report = DatabaseBuilder::new(&handle, &suggest_dir).build_all().unwrap();
        assert_eq!(report, BuildReport::default());

        let handler = SuggestionHandler::load(&suggest_dir, 1);
        assert!(handler.is_loaded(SuggestionDatabase::FileName));
        assert!(handler.is_loaded(SuggestionDatabase::Symbol));
        assert!(handler.suggest(SuggestionDatabase::Symbol, "x", 5).is_empty());
    }
}
