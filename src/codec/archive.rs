//! Archives of named automaton blobs.
//!
//! ```text
//! magic "TSAR" | version u16
//! repeat: tag u8 (1 = entry, 0 = end) | name_len u32 | name | blob_len u64 | blob
//! ```
//!
//! Entries are kept in written order. Framing is validated when an archive is
//! opened; blobs are only decoded on demand, so a corrupt blob fails its own
//! entry and nothing else.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{Deref, Range};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, info};

use super::{decode, encode};
use crate::automaton::AnyDfa;
use crate::error::{DecodeError, TermscanError};

/// Magic bytes opening every archive.
pub const ARCHIVE_MAGIC: [u8; 4] = *b"TSAR";

/// Current archive format version.
pub const ARCHIVE_VERSION: u16 = 1;

const TAG_END: u8 = 0;
const TAG_ENTRY: u8 = 1;

/// True when `bytes` starts like an archive (as opposed to a single blob).
pub fn is_archive(bytes: &[u8]) -> bool {
    bytes.starts_with(&ARCHIVE_MAGIC)
}

/// Streams entries into an archive.
pub struct ArchiveWriter<W: Write> {
    inner: W,
    entries: usize,
}

impl<W: Write> ArchiveWriter<W> {
    /// Write the archive header.
    pub fn new(mut inner: W) -> Result<Self, TermscanError> {
        inner.write_all(&ARCHIVE_MAGIC)?;
        inner.write_all(&ARCHIVE_VERSION.to_le_bytes())?;
        Ok(Self { inner, entries: 0 })
    }

    /// Encode and append an automaton.
    pub fn add(&mut self, name: &str, dfa: &AnyDfa) -> Result<(), TermscanError> {
        let blob = encode(dfa)?;
        self.add_blob(name, &blob)
    }

    /// Append an already-encoded blob.
    pub fn add_blob(&mut self, name: &str, blob: &[u8]) -> Result<(), TermscanError> {
        let name_len = u32::try_from(name.len())
            .map_err(|_| TermscanError::Encode(format!("entry name too long: {} bytes", name.len())))?;
        self.inner.write_all(&[TAG_ENTRY])?;
        self.inner.write_all(&name_len.to_le_bytes())?;
        self.inner.write_all(name.as_bytes())?;
        self.inner.write_all(&(blob.len() as u64).to_le_bytes())?;
        self.inner.write_all(blob)?;
        self.entries += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Write the end marker, flush, and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, TermscanError> {
        self.inner.write_all(&[TAG_END])?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Write `entries` to a new archive file at `path`.
pub fn write_archive<'a, I>(path: &Path, entries: I) -> Result<usize, TermscanError>
where
    I: IntoIterator<Item = (String, &'a AnyDfa)>,
{
    let file = File::create(path)?;
    let mut writer = ArchiveWriter::new(BufWriter::new(file))?;
    for (name, dfa) in entries {
        writer.add(&name, dfa)?;
    }
    let written = writer.len();
    writer.finish()?;
    info!(path = %path.display(), entries = written, "wrote automaton archive");
    Ok(written)
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(map) => map,
            Backing::Owned(bytes) => bytes,
        }
    }
}

struct EntryIndex {
    name: String,
    blob: Range<usize>,
}

/// A borrowed view of one archive entry.
#[derive(Clone, Copy, Debug)]
pub struct ArchiveEntry<'a> {
    pub name: &'a str,
    pub blob: &'a [u8],
}

impl ArchiveEntry<'_> {
    pub fn decode(&self) -> Result<AnyDfa, TermscanError> {
        decode(self.blob).map_err(|e| TermscanError::decode(self.name, e))
    }
}

/// An opened archive. The backing file stays mapped until the archive is dropped.
pub struct Archive {
    data: Backing,
    entries: Vec<EntryIndex>,
}

impl Archive {
    /// Map an archive file and index its entries.
    pub fn open(path: &Path) -> Result<Self, TermscanError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        // Zero-length files cannot be mapped portably.
        let data = if len == 0 {
            Backing::Owned(Vec::new())
        } else {
            // SAFETY: the archive is opened read-only and never written while mapped.
            Backing::Mapped(unsafe { Mmap::map(&file)? })
        };
        let entries = index_entries(&data)
            .map_err(|e| TermscanError::decode(path.display().to_string(), e))?;
        debug!(path = %path.display(), entries = entries.len(), "opened automaton archive");
        Ok(Self { data, entries })
    }

    /// Index an in-memory archive.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let data = Backing::Owned(bytes);
        let entries = index_entries(&data)?;
        Ok(Self { data, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ArchiveEntry<'_>> {
        self.entries.get(index).map(|e| ArchiveEntry {
            name: &e.name,
            blob: &self.data[e.blob.clone()],
        })
    }

    /// Entries in written order.
    pub fn entries(&self) -> impl Iterator<Item = ArchiveEntry<'_>> + '_ {
        (0..self.entries.len()).filter_map(move |i| self.get(i))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Decode every entry in order, stopping at the first failure.
    pub fn decode_all(&self) -> Result<Vec<(String, AnyDfa)>, TermscanError> {
        self.entries()
            .map(|entry| Ok((entry.name.to_string(), entry.decode()?)))
            .collect()
    }
}

/// A bounds-checked cursor over archive bytes.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<Range<usize>, DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DecodeError::Truncated {
                needed: self.pos.saturating_add(n),
                available: self.bytes.len(),
            })?;
        let range = self.pos..end;
        self.pos = end;
        Ok(range)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let range = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[range]);
        Ok(out)
    }
}

fn index_entries(bytes: &[u8]) -> Result<Vec<EntryIndex>, DecodeError> {
    let mut cursor = Cursor { bytes, pos: 0 };
    if cursor.array::<4>()? != ARCHIVE_MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = u16::from_le_bytes(cursor.array::<2>()?);
    if version != ARCHIVE_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            expected: ARCHIVE_VERSION,
            actual: version,
        });
    }

    let mut entries = Vec::new();
    loop {
        match cursor.array::<1>()?[0] {
            TAG_END => break,
            TAG_ENTRY => {
                let name_len = u32::from_le_bytes(cursor.array::<4>()?) as usize;
                let name_range = cursor.take(name_len)?;
                let name = std::str::from_utf8(&bytes[name_range])
                    .map_err(|_| DecodeError::Invalid("entry name is not UTF-8".to_string()))?
                    .to_string();
                let blob_len = usize::try_from(u64::from_le_bytes(cursor.array::<8>()?))
                    .map_err(|_| DecodeError::Invalid("entry length overflow".to_string()))?;
                let blob = cursor.take(blob_len)?;
                entries.push(EntryIndex { name, blob });
            }
            tag => {
                return Err(DecodeError::Invalid(format!(
                    "unknown entry tag {tag} at byte {}",
                    cursor.pos - 1
                )))
            }
        }
    }
    if cursor.pos != bytes.len() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(entries)
}
