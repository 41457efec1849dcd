//! Source tags attached to indexed documents.
//!
//! A [`Tags`] container maps byte offsets to the tags starting there and is
//! stored in the index as a versioned binary blob:
//!
//! ```text
//! "TAGS" version:u8 count:u32
//! count × { offset:u64 kind:u8 original_kind:str text:str line:u32 start:u32 end:u32 }
//! str = len:u32 utf8-bytes
//! ```
//!
//! All integers are little endian.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::{Location, LocationError};

/// Blob header.
const MAGIC: &[u8; 4] = b"TAGS";

/// Current encoding version.
const VERSION: u8 = 1;

/// Errors decoding or encoding a tags blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagsError {
    /// The blob does not start with the tags header.
    #[error("missing tags header")]
    BadMagic,
    /// The blob was written by an unknown encoder.
    #[error("unsupported tags version {0}")]
    UnsupportedVersion(u8),
    /// The blob ended mid-record.
    #[error("truncated tags blob")]
    Truncated,
    /// Bytes remain after the last record.
    #[error("{0} trailing bytes after tags")]
    TrailingBytes(usize),
    /// Unknown generic kind code.
    #[error("unknown tag kind code {0}")]
    UnknownKind(u8),
    /// A string field is not UTF-8.
    #[error("tag text is not valid UTF-8")]
    InvalidUtf8,
    /// A stored location violates its invariants.
    #[error("invalid tag location: {0}")]
    InvalidLocation(#[from] LocationError),
    /// A value does not fit the fixed-width encoding.
    #[error("tag value too large to encode")]
    Overflow,
}

/// Language-independent classification of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenericKind {
    /// Anything not covered below.
    Other,
    /// Classes, structs, enums, typedefs.
    Type,
    /// Preprocessor or language macros.
    Macro,
    /// Constants and enumerators.
    Constant,
    /// Functions and methods.
    Function,
    /// Struct fields and members.
    Field,
    /// Forward declarations.
    Prototype,
    /// Variables, locals and parameters.
    Variable,
    /// Jump labels.
    Label,
    /// Modules, namespaces, packages.
    Module,
}

impl GenericKind {
    /// Every kind, in encoding order.
    pub const ALL: [Self; 10] = [
        Self::Other,
        Self::Type,
        Self::Macro,
        Self::Constant,
        Self::Function,
        Self::Field,
        Self::Prototype,
        Self::Variable,
        Self::Label,
        Self::Module,
    ];

    /// Lowercase name, as indexed in the tag kind field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Type => "type",
            Self::Macro => "macro",
            Self::Constant => "constant",
            Self::Function => "function",
            Self::Field => "field",
            Self::Prototype => "prototype",
            Self::Variable => "variable",
            Self::Label => "label",
            Self::Module => "module",
        }
    }

    /// Autocomplete weight of symbols of this kind.
    pub fn suggestion_weight(self) -> u64 {
        match self {
            Self::Type => 5,
            Self::Function => 4,
            Self::Field => 3,
            _ => 1,
        }
    }

    /// Byte used in the tags encoding.
    fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`code`](Self::code).
    fn from_code(code: u8) -> Result<Self, TagsError> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(TagsError::UnknownKind(code))
    }
}

impl fmt::Display for GenericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenericKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| format!("unknown tag kind: {s}"))
    }
}

/// One recorded occurrence of a source entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    /// Generic classification.
    pub generic_kind: GenericKind,
    /// Where the tag text sits.
    pub location: Location,
    /// Symbol text as written in the source.
    pub text: String,
    /// Kind reported by the tagging tool, e.g. `member`.
    pub original_kind: String,
}

impl Tag {
    /// Creates a tag.
    pub fn new(
        generic_kind: GenericKind,
        location: Location,
        text: impl Into<String>,
        original_kind: impl Into<String>,
    ) -> Self {
        Self {
            generic_kind,
            location,
            text: text.into(),
            original_kind: original_kind.into(),
        }
    }
}

/// Tags of one document keyed by start offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    /// Offset to tags starting there, in insertion order.
    by_offset: BTreeMap<usize, Vec<Tag>>,
}

impl Tags {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tag` at `offset`, after any tags already there.
    pub fn add(&mut self, offset: usize, tag: Tag) {
        self.by_offset.entry(offset).or_default().push(tag);
    }

    /// The first tag recorded at `offset`.
    pub fn first_at(&self, offset: usize) -> Option<&Tag> {
        self.by_offset.get(&offset).and_then(|tags| tags.first())
    }

    /// All tags recorded at `offset`.
    pub fn all_at(&self, offset: usize) -> &[Tag] {
        self.by_offset.get(&offset).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every `(offset, tag)` pair.
    pub fn all_tags(&self) -> impl Iterator<Item = (usize, &Tag)> {
        self.by_offset
            .iter()
            .flat_map(|(offset, tags)| tags.iter().map(move |tag| (*offset, tag)))
    }

    /// Distinct kinds as reported by the tagging tool.
    pub fn original_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self
            .all_tags()
            .map(|(_, tag)| tag.original_kind.as_str())
            .filter(|kind| !kind.is_empty())
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    /// Distinct generic kinds.
    pub fn generic_kinds(&self) -> Vec<GenericKind> {
        let mut kinds: Vec<GenericKind> = self.all_tags().map(|(_, tag)| tag.generic_kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    /// Total number of tags.
    pub fn len(&self) -> usize {
        self.by_offset.values().map(Vec::len).sum()
    }

    /// True when no tag has been recorded.
    pub fn is_empty(&self) -> bool {
        self.by_offset.is_empty()
    }

    /// Encodes the container as a tags blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TagsError> {
        let mut out = Vec::with_capacity(9 + self.len() * 32);
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        put_u32(&mut out, self.len())?;

        for (offset, tag) in self.all_tags() {
            let offset = u64::try_from(offset).map_err(|_| TagsError::Overflow)?;
            out.extend_from_slice(&offset.to_le_bytes());
            out.push(tag.generic_kind.code());
            put_str(&mut out, &tag.original_kind)?;
            put_str(&mut out, &tag.text)?;
            put_u32(&mut out, tag.location.line())?;
            put_u32(&mut out, tag.location.start_column())?;
            put_u32(&mut out, tag.location.end_column())?;
        }

        Ok(out)
    }

    /// Decodes a tags blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TagsError> {
        let mut reader = ByteReader { bytes, pos: 0 };

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(TagsError::BadMagic);
        }
        let version = reader.u8()?;
        if version != VERSION {
            return Err(TagsError::UnsupportedVersion(version));
        }

        let count = reader.u32()?;
        let mut tags = Self::new();
        for _ in 0..count {
            let offset = usize::try_from(reader.u64()?).map_err(|_| TagsError::Overflow)?;
            let generic_kind = GenericKind::from_code(reader.u8()?)?;
            let original_kind = reader.string()?;
            let text = reader.string()?;
            let line = reader.u32()?;
            let start = reader.u32()?;
            let end = reader.u32()?;
            let location = Location::new(line, start, end)?;
            tags.add(
                offset,
                Tag {
                    generic_kind,
                    location,
                    text,
                    original_kind,
                },
            );
        }

        let remaining = bytes.len() - reader.pos;
        if remaining != 0 {
            return Err(TagsError::TrailingBytes(remaining));
        }
        Ok(tags)
    }
}

/// Appends a length or position as a little-endian u32.
fn put_u32(out: &mut Vec<u8>, value: usize) -> Result<(), TagsError> {
    let value = u32::try_from(value).map_err(|_| TagsError::Overflow)?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Appends a length-prefixed string.
fn put_str(out: &mut Vec<u8>, value: &str) -> Result<(), TagsError> {
    put_u32(out, value.len())?;
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Cursor over a tags blob.
struct ByteReader<'a> {
    /// The whole blob.
    bytes: &'a [u8],
    /// Next unread byte.
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Consumes exactly `len` bytes.
    fn take(&mut self, len: usize) -> Result<&'a [u8], TagsError> {
        let end = self.pos.checked_add(len).ok_or(TagsError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(TagsError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    /// Reads one byte.
    fn u8(&mut self) -> Result<u8, TagsError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a little-endian u32 as usize.
    fn u32(&mut self) -> Result<usize, TagsError> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.take(4)?);
        usize::try_from(u32::from_le_bytes(buf)).map_err(|_| TagsError::Overflow)
    }

    /// Reads a little-endian u64.
    fn u64(&mut self) -> Result<u64, TagsError> {
        let mut buf = [0; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads a length-prefixed UTF-8 string.
    fn string(&mut self) -> Result<String, TagsError> {
        let len = self.u32()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| TagsError::InvalidUtf8)
    }
}
