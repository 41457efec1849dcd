//! Implementation of `seek index`.

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use seek_index::{IndexError, IndexFileRequest, Service};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use crate::cli::{args::IndexCommand, context::CommandContext};

/// Suffix of ctags sidecar files, which are read with their source file.
const SIDECAR_SUFFIX: &str = ".tags.json";

/// Indexes every file below the given paths.
pub fn run(ctx: &CommandContext, cmd: &IndexCommand) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let index_dir = fs::canonicalize(&ctx.config.index_dir).ok();

    let mut indexed = 0usize;
    let mut failed = 0usize;
    for path in cmd.paths.iter().flat_map(|root| files_below(root, index_dir.as_deref())) {
        match index_path(&service, &path, &cmd.mime_type) {
            Ok(()) => indexed += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                failed += 1;
            }
        }
    }
    println!("Indexed {indexed} files ({failed} failed)");

    let mut code = if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };
    if cmd.build_suggestions {
        match service.build_suggestions() {
            Ok(report) => println!(
                "Built suggestions: {} file names, {} symbols",
                report.file_names, report.symbols
            ),
            Err(e) => {
                eprintln!("error: failed to build suggestions: {e}");
                code = ExitCode::FAILURE;
            }
        }
    }
    service.close();
    code
}

/// Indexes one file under its path as file id.
fn index_path(service: &Service, path: &Path, mime_type: &str) -> Result<(), IndexError> {
    service.index_file_blocking(&IndexFileRequest {
        file_id: path.to_string_lossy().into_owned(),
        file_path: path.to_path_buf(),
        mime_type: mime_type.to_string(),
    })
}

/// Regular files below `root`, skipping hidden entries, sidecars and the index itself.
fn files_below(root: &Path, index_dir: Option<&Path>) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !skip_entry(entry, index_dir))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "cannot read directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.file_name().to_string_lossy().ends_with(SIDECAR_SUFFIX))
        .map(DirEntry::into_path)
        .collect()
}

/// True for hidden entries and the index directory.
fn skip_entry(entry: &DirEntry, index_dir: Option<&Path>) -> bool {
    if entry.file_name().to_string_lossy().starts_with('.') {
        return true;
    }
    entry.file_type().is_dir()
        && index_dir.is_some_and(|dir| fs::canonicalize(entry.path()).is_ok_and(|p| p == dir))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn walks_sources_only() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("idx")).unwrap();
        for file in [
            "src/a.c",
            "src/a.c.tags.json",
            "src/nested/b.c",
            ".git/config",
            "idx/meta.json",
        ] {
            fs::write(root.join(file), "x").unwrap();
        }

        let index_dir = fs::canonicalize(root.join("idx")).unwrap();
        let files = files_below(root, Some(&index_dir));
        assert_eq!(files, vec![root.join("src/a.c"), root.join("src/nested/b.c")]);
    }

    #[test]
    fn single_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("one.c");
        fs::write(&file, "x").unwrap();
        assert_eq!(files_below(&file, None), vec![file]);
    }
}
