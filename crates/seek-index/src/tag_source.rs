//! Where the tags of an indexed file come from.
//!
//! [`CtagsJsonSource`] reads the JSON-lines output of universal-ctags
//! (`ctags --output-format=json`) from a sidecar file named after the source
//! file with `.tags.json` appended. Each entry names a symbol and its line;
//! the symbol is located in that line to recover its byte offset.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    analyzer::is_token_char,
    error::IndexError,
    location::{LineInformations, Location},
    tags::{GenericKind, Tag, Tags},
};

/// Produces the tags of a file being indexed.
pub trait TagSource: Send + Sync {
    /// Tags of the file at `path` whose text is `content`.
    fn tags(&self, path: &Path, content: &str) -> Result<Tags, IndexError>;
}

/// Indexes files without tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTags;

impl TagSource for NoTags {
    fn tags(&self, _path: &Path, _content: &str) -> Result<Tags, IndexError> {
        Ok(Tags::new())
    }
}

/// Reads universal-ctags JSON sidecar files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CtagsJsonSource;

/// One line of ctags JSON output.
#[derive(Debug, Deserialize)]
struct CtagsEntry {
    /// `tag` for symbols, `ptag` for pseudo tags.
    #[serde(rename = "_type", default)]
    entry_type: Option<String>,
    /// Symbol text.
    name: String,
    /// 1-based line.
    line: Option<usize>,
    /// Language-specific kind, e.g. `member`.
    #[serde(default)]
    kind: String,
}

impl CtagsJsonSource {
    /// Sidecar path for `path`.
    pub fn sidecar(path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".tags.json");
        PathBuf::from(name)
    }

    /// Parses ctags JSON lines against `content`.
    ///
    /// Unparseable lines and symbols not found on their line are skipped.
    pub fn parse(json_lines: &str, content: &str) -> Tags {
        let lines = LineInformations::from_content(content);
        let mut tags = Tags::new();
        for raw in json_lines.lines().filter(|l| !l.trim().is_empty()) {
            let entry: CtagsEntry = match serde_json::from_str(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping malformed ctags line");
                    continue;
                }
            };
            if entry.entry_type.as_deref().is_some_and(|t| t != "tag") {
                continue;
            }
            match locate(&lines, &entry) {
                Some((offset, location)) => tags.add(
                    offset,
                    Tag::new(ctags_kind(&entry.kind), location, entry.name, entry.kind),
                ),
                None => debug!(symbol = %entry.name, line = ?entry.line, "symbol not found on its line"),
            }
        }
        tags
    }
}

impl TagSource for CtagsJsonSource {
    fn tags(&self, path: &Path, content: &str) -> Result<Tags, IndexError> {
        let sidecar = Self::sidecar(path);
        match fs::read_to_string(&sidecar) {
            Ok(json) => Ok(Self::parse(&json, content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Tags::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Byte offset and location of the entry's symbol.
fn locate(lines: &LineInformations, entry: &CtagsEntry) -> Option<(usize, Location)> {
    let line = entry.line?;
    if entry.name.is_empty() {
        return None;
    }
    let text = lines.line_content(line).ok()?;
    let column = find_symbol(text, &entry.name)?;
    let offset = lines.line_start_offset(line).ok()? + column;
    let location = Location::new(line, column + 1, column + entry.name.len()).ok()?;
    Some((offset, location))
}

/// Byte index of the first occurrence of `name` in `text` that is not part of
/// a longer token.
///
/// Boundaries are only checked on sides where `name` itself ends in a token
/// character, so `~Foo` is found right after `Foo::`.
fn find_symbol(text: &str, name: &str) -> Option<usize> {
    let open_start = name.chars().next().is_some_and(is_token_char);
    let open_end = name.chars().next_back().is_some_and(is_token_char);
    text.match_indices(name).map(|(start, _)| start).find(|&start| {
        let end = start + name.len();
        let joined_before =
            open_start && text[..start].chars().next_back().is_some_and(is_token_char);
        let joined_after =
            open_end && text[end..].chars().next().is_some_and(is_token_char);
        !joined_before && !joined_after
    })
}

/// Generic kind of a ctags kind name.
pub fn ctags_kind(kind: &str) -> GenericKind {
    match kind {
        "function" | "method" | "subroutine" | "func" => GenericKind::Function,
        "prototype" | "externfunc" => GenericKind::Prototype,
        "class" | "struct" | "union" | "enum" | "typedef" | "interface" | "type" | "trait" => {
            GenericKind::Type
        }
        "macro" | "define" => GenericKind::Macro,
        "constant" | "enumerator" | "const" => GenericKind::Constant,
        "member" | "field" | "property" => GenericKind::Field,
        "variable" | "local" | "parameter" | "externvar" | "var" => GenericKind::Variable,
        "label" => GenericKind::Label,
        "namespace" | "module" | "package" => GenericKind::Module,
        _ => GenericKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const CONTENT: &str = "struct point { int x; };\nint main() {\n  return 0;\n}\n";

    #[test]
    fn parses_entries() {
        let json = r#"{"_type": "ptag", "name": "JSON_OUTPUT_VERSION", "path": "0.0"}
{"_type": "tag", "name": "point", "path": "a.c", "line": 1, "kind": "struct"}
{"_type": "tag", "name": "x", "path": "a.c", "line": 1, "kind": "member"}
{"_type": "tag", "name": "main", "path": "a.c", "line": 2, "kind": "function"}
not json
{"_type": "tag", "name": "ghost", "path": "a.c", "line": 3, "kind": "variable"}
"#;
        let tags = CtagsJsonSource::parse(json, CONTENT);
        assert_eq!(tags.len(), 3);

        let point = tags.first_at(7).unwrap();
        assert_eq!(point.generic_kind, GenericKind::Type);
        assert_eq!(point.location, Location::new(1, 8, 12).unwrap());

        let x = tags.first_at(19).unwrap();
        assert_eq!(x.generic_kind, GenericKind::Field);
        assert_eq!(x.original_kind, "member");

        let main = tags.first_at(29).unwrap();
        assert_eq!(main.text, "main");
        assert_eq!(main.location, Location::new(2, 5, 8).unwrap());
    }

    #[test]
    fn symbols_are_located_on_token_boundaries() {
        let json = r#"{"_type": "tag", "name": "n", "line": 1, "kind": "variable"}"#;
        let tags = CtagsJsonSource::parse(json, "int n;\nn = 3;\n");
        assert!(tags.first_at(1).is_none());
        let n = tags.first_at(4).unwrap();
        assert_eq!(n.location, Location::new(1, 5, 5).unwrap());

        let json = r#"{"_type": "tag", "name": "~Foo", "line": 1, "kind": "function"}"#;
        let tags = CtagsJsonSource::parse(json, "Foo::~Foo() {}\n");
        assert_eq!(tags.first_at(5).unwrap().location, Location::new(1, 6, 9).unwrap());

        assert_eq!(find_symbol("index idx", "idx"), Some(6));
        assert_eq!(find_symbol("a == b; operator==(x)", "operator=="), Some(8));
        assert_eq!(find_symbol("maximum", "max"), None);
    }

    #[test]
    fn kind_mapping() {
        assert_eq!(ctags_kind("method"), GenericKind::Function);
        assert_eq!(ctags_kind("typedef"), GenericKind::Type);
        assert_eq!(ctags_kind("enumerator"), GenericKind::Constant);
        assert_eq!(ctags_kind("namespace"), GenericKind::Module);
        assert_eq!(ctags_kind("heading"), GenericKind::Other);
    }

    #[test]
    fn reads_sidecar_or_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.c");
        fs::write(&source, CONTENT).unwrap();
        assert!(CtagsJsonSource.tags(&source, CONTENT).unwrap().is_empty());

        fs::write(
            CtagsJsonSource::sidecar(&source),
            r#"{"_type": "tag", "name": "main", "line": 2, "kind": "function"}"#,
        )
        .unwrap();
        let tags = CtagsJsonSource.tags(&source, CONTENT).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(CtagsJsonSource::sidecar(&source), temp.path().join("a.c.tags.json"));
    }

    #[test]
    fn no_tags() {
        assert!(NoTags.tags(Path::new("/a.c"), CONTENT).unwrap().is_empty());
    }
}
