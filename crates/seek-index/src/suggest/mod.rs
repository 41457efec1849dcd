//! Autocomplete suggestions.
//!
//! Two databases live under `<index_dir>/suggest/`:
//!
//! - **file names** (`filename/suggest.db`): an FST over lowercased file
//!   names with a payload table, looked up with a Levenshtein prefix
//!   automaton so that `mian` still finds `main.rs`.
//! - **symbols** (`symbols/`): a small Tantivy index over tag texts, looked up
//!   by infix: every input token must occur in the symbol, the last one as a
//!   prefix.
//!
//! Both are rebuilt from an index snapshot by [`DatabaseBuilder`] and served
//! by a [`SuggestionHandler`], which degrades to empty results for a missing
//! or unreadable database.

mod builder;
mod filename;
mod input;
mod symbol;

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

pub use builder::{BuildReport, DatabaseBuilder};
pub use filename::FileNameDatabase;
pub use input::{FileNameInputIterator, SuggestInput, TagInputIterator, UniqueInputIterator};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
pub use symbol::SymbolDatabase;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while building or loading a suggestion database.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// Reading or writing database files failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file name database is not in the expected format.
    #[error("corrupt suggestion database: {0}")]
    Corrupt(String),

    /// The symbol index failed.
    #[error("symbol index: {0}")]
    Index(String),
}

impl SuggestError {
    /// Wraps an I/O error with the path it concerns.
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wraps a Tantivy error from the symbol index.
    pub(crate) fn index(source: &tantivy::TantivyError) -> Self {
        Self::Index(source.to_string())
    }
}

/// The suggestion databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionDatabase {
    /// File names.
    FileName,
    /// Tag texts.
    Symbol,
}

impl SuggestionDatabase {
    /// Location of the database below `suggest_dir`.
    pub fn path(self, suggest_dir: &Path) -> PathBuf {
        match self {
            Self::FileName => suggest_dir.join("filename").join("suggest.db"),
            Self::Symbol => suggest_dir.join("symbols"),
        }
    }
}

impl fmt::Display for SuggestionDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FileName => "file name",
            Self::Symbol => "symbol",
        })
    }
}

/// Serves suggestions from the loaded databases.
pub struct SuggestionHandler {
    /// Directory holding both databases.
    dir: PathBuf,
    /// Edit distance for file name lookups.
    fuzzy_distance: u8,
    /// Loaded file name database.
    file_names: RwLock<Option<FileNameDatabase>>,
    /// Opened symbol database.
    symbols: RwLock<Option<SymbolDatabase>>,
}

impl SuggestionHandler {
    /// Loads both databases from `dir`; failures are logged.
    pub fn load(dir: &Path, fuzzy_distance: u8) -> Self {
        let handler = Self {
            dir: dir.to_path_buf(),
            fuzzy_distance,
            file_names: RwLock::new(None),
            symbols: RwLock::new(None),
        };
        handler.reload();
        handler
    }

    /// Reopens both databases, typically after a rebuild.
    pub fn reload(&self) {
        let path = SuggestionDatabase::FileName.path(&self.dir);
        *self.file_names.write() = load_logged(SuggestionDatabase::FileName, &path, || {
            FileNameDatabase::load(&path)
        });

        let path = SuggestionDatabase::Symbol.path(&self.dir);
        *self.symbols.write() =
            load_logged(SuggestionDatabase::Symbol, &path, || SymbolDatabase::open(&path));
    }

    /// Up to `limit` suggestions for `input` from `database`.
    ///
    /// Matching ignores case. Lookup failures are logged and yield nothing.
    pub fn suggest(&self, database: SuggestionDatabase, input: &str, limit: usize) -> Vec<String> {
        let result = match database {
            SuggestionDatabase::FileName => Ok(self
                .file_names
                .read()
                .as_ref()
                .map(|db| db.lookup(input, limit, self.fuzzy_distance))
                .unwrap_or_default()),
            SuggestionDatabase::Symbol => match self.symbols.read().as_ref() {
                Some(db) => db.lookup(input, limit),
                None => Ok(Vec::new()),
            },
        };
        result.unwrap_or_else(|e| {
            warn!(%database, input, error = %e, "suggestion lookup failed");
            Vec::new()
        })
    }

    /// Whether `database` is loaded.
    pub fn is_loaded(&self, database: SuggestionDatabase) -> bool {
        match database {
            SuggestionDatabase::FileName => self.file_names.read().is_some(),
            SuggestionDatabase::Symbol => self.symbols.read().is_some(),
        }
    }
}

/// Runs `load` if `path` exists, logging the outcome.
fn load_logged<T>(
    database: SuggestionDatabase,
    path: &Path,
    load: impl FnOnce() -> Result<T, SuggestError>,
) -> Option<T> {
    if !path.exists() {
        debug!(%database, path = %path.display(), "no suggestion database");
        return None;
    }
    match load() {
        Ok(db) => {
            info!(%database, path = %path.display(), "loaded suggestion database");
            Some(db)
        }
        Err(e) => {
            warn!(%database, path = %path.display(), error = %e, "failed to load suggestion database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn database_paths() {
        let dir = Path::new("/idx/suggest");
        assert_eq!(
            SuggestionDatabase::FileName.path(dir),
            PathBuf::from("/idx/suggest/filename/suggest.db")
        );
        assert_eq!(
            SuggestionDatabase::Symbol.path(dir),
            PathBuf::from("/idx/suggest/symbols")
        );
    }

    #[test]
    fn missing_databases_serve_nothing() {
        let temp = TempDir::new().unwrap();
        let handler = SuggestionHandler::load(temp.path(), 1);
        assert!(!handler.is_loaded(SuggestionDatabase::FileName));
        assert!(!handler.is_loaded(SuggestionDatabase::Symbol));
        assert!(handler.suggest(SuggestionDatabase::FileName, "main", 10).is_empty());
        assert!(handler.suggest(SuggestionDatabase::Symbol, "main", 10).is_empty());
    }

    #[test]
    fn corrupt_database_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = SuggestionDatabase::FileName.path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"garbage").unwrap();

        let handler = SuggestionHandler::load(temp.path(), 1);
        assert!(!handler.is_loaded(SuggestionDatabase::FileName));
    }

    #[test]
    fn database_names() {
        assert_eq!(SuggestionDatabase::FileName.to_string(), "file name");
        assert_eq!(
            serde_json::to_string(&SuggestionDatabase::Symbol).unwrap(),
            "\"symbol\""
        );
    }
}
