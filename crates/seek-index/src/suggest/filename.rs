//! File name suggestion database.
//!
//! On-disk layout, little endian:
//!
//! ```text
//! b"SGDB" | version u8 | count u32 | count x (weight u64, len u32, payload) | fst
//! ```
//!
//! The FST maps each lowercased file name to its entry index.

use std::{cmp::Ordering, fs, path::Path};

use tantivy_fst::{IntoStreamer, Map, MapBuilder, Streamer, raw::Fst};

use super::{SuggestError, SuggestInput};
use crate::query::LevenshteinDfa;

/// File magic.
const MAGIC: &[u8; 4] = b"SGDB";

/// Current format version.
const VERSION: u8 = 1;

/// Largest edit distance used for lookups.
const MAX_DISTANCE: u8 = 2;

/// Payload and weight of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    /// Ranking weight.
    weight: u64,
    /// Text returned for the key.
    payload: String,
}

/// Fuzzy prefix lookup over file names.
pub struct FileNameDatabase {
    /// Key to entry index.
    map: Map<Vec<u8>>,
    /// Entries by index.
    entries: Vec<Entry>,
}

impl FileNameDatabase {
    /// Encodes `inputs`, which must be sorted by key with no repeats.
    ///
    /// Returns the encoded database and its number of entries.
    pub fn encode(inputs: impl Iterator<Item = SuggestInput>) -> Result<(Vec<u8>, usize), SuggestError> {
        let mut builder = MapBuilder::new(Vec::new()).map_err(|e| fst_error(&e))?;
        let mut table = Vec::new();
        let mut count: u32 = 0;
        for input in inputs {
            builder
                .insert(input.key.as_bytes(), u64::from(count))
                .map_err(|e| fst_error(&e))?;
            let payload = input.display().as_bytes();
            table.extend_from_slice(&input.weight.to_le_bytes());
            put_len(&mut table, payload.len())?;
            table.extend_from_slice(payload);
            count = count
                .checked_add(1)
                .ok_or_else(|| SuggestError::Corrupt("too many file names".into()))?;
        }
        let fst = builder.into_inner().map_err(|e| fst_error(&e))?;

        let mut out = Vec::with_capacity(MAGIC.len() + 5 + table.len() + fst.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&table);
        out.extend_from_slice(&fst);
        Ok((out, count as usize))
    }

    /// Decodes a database produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, SuggestError> {
        let mut reader = Reader { bytes, pos: 0 };
        if reader.take(MAGIC.len())? != MAGIC {
            return Err(SuggestError::Corrupt("bad magic".into()));
        }
        let version = reader.take(1)?[0];
        if version != VERSION {
            return Err(SuggestError::Corrupt(format!("unsupported version {version}")));
        }
        let count = reader.u32()?;

        let mut entries = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            let weight = reader.u64()?;
            let len = reader.u32()? as usize;
            let payload = String::from_utf8(reader.take(len)?.to_vec())
                .map_err(|_| SuggestError::Corrupt("payload is not UTF-8".into()))?;
            entries.push(Entry { weight, payload });
        }

        let fst = Fst::new(reader.rest().to_vec()).map_err(|e| fst_error(&e))?;
        Ok(Self {
            map: Map::from(fst),
            entries,
        })
    }

    /// Reads the database at `path`.
    pub fn load(path: &Path) -> Result<Self, SuggestError> {
        let bytes = fs::read(path).map_err(|e| SuggestError::io(path, e))?;
        Self::decode(&bytes)
    }

    /// Writes `inputs` to `path`, replacing any previous database.
    pub fn build(
        path: &Path,
        inputs: impl Iterator<Item = SuggestInput>,
    ) -> Result<usize, SuggestError> {
        let (bytes, count) = Self::encode(inputs)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SuggestError::io(parent, e))?;
        }
        fs::write(path, bytes).map_err(|e| SuggestError::io(path, e))?;
        Ok(count)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the database has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` names starting with `input` up to `distance` edits.
    ///
    /// Names that start with the input exactly rank first, then by weight.
    pub fn lookup(&self, input: &str, limit: usize, distance: u8) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }
        let key = input.to_lowercase();
        let automaton = LevenshteinDfa::new(&key, distance.min(MAX_DISTANCE), true);

        let mut hits: Vec<(bool, u64, String, usize)> = Vec::new();
        let mut stream = self.map.search(automaton).into_stream();
        while let Some((name, idx)) = stream.next() {
            let Some(entry) = self.entries.get(idx as usize) else {
                continue;
            };
            let name = String::from_utf8_lossy(name).into_owned();
            hits.push((name.starts_with(&key), entry.weight, name, idx as usize));
        }

        hits.sort_by(|a, b| match b.0.cmp(&a.0) {
            Ordering::Equal => b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)),
            other => other,
        });
        hits.into_iter()
            .take(limit)
            .map(|(_, _, _, idx)| self.entries[idx].payload.clone())
            .collect()
    }
}

/// Cursor over an encoded database.
struct Reader<'a> {
    /// Encoded bytes.
    bytes: &'a [u8],
    /// Read position.
    pos: usize,
}

impl<'a> Reader<'a> {
    /// The next `len` bytes.
    fn take(&mut self, len: usize) -> Result<&'a [u8], SuggestError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| SuggestError::Corrupt("truncated".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// A little-endian `u32`.
    fn u32(&mut self) -> Result<u32, SuggestError> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    /// A little-endian `u64`.
    fn u64(&mut self) -> Result<u64, SuggestError> {
        let mut buf = [0; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// Everything not yet read.
    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

/// Appends `len` as a little-endian `u32`.
fn put_len(out: &mut Vec<u8>, len: usize) -> Result<(), SuggestError> {
    let len = u32::try_from(len)
        .map_err(|_| SuggestError::Corrupt(format!("payload of {len} bytes is too long")))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

/// Maps an FST failure to a database error.
fn fst_error(e: &tantivy_fst::Error) -> SuggestError {
    SuggestError::Corrupt(e.to_string())
}
