//! PAK - flat archive container.
//!
//! The built-in archive format: a flat list of named entries, each stored
//! verbatim or as an LZ4 block. It is deliberately minimal — the shape a
//! third-party format mapper is expected to take, and the format the crate's
//! own conformance tests are written against.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "NPAK"              (4 bytes)
//! [0x04] EntryCount                (u32 LE)
//! [0x08] NameTableSize             (u32 LE)
//! [0x0C] Reserved (always 0)       (4 bytes)
//! [0x10] EntryTable                (EntryCount × 28 bytes)
//! [0x10 + EntryCount×28]
//!        NameTable                 (NUL-terminated UTF-8 names)
//! [0x10 + EntryCount×28 + NameTableSize]
//!        DataSection               (remaining bytes)
//! ```
//!
//! ## Entry (28 bytes)
//! ```text
//! [0x00] Offset     - relative to the data section start (u64 LE)
//! [0x08] StoredSize - bytes occupied in the data section (u64 LE)
//! [0x10] Size       - decoded size in bytes (u32 LE)
//! [0x14] NameOffset - byte offset into the name table (u32 LE)
//! [0x18] Method     - 0 = stored, 1 = LZ4 size-prepended block (u32 LE)
//! ```
//!
//! ## Notes
//! * Entry names may contain `/` to model sub-paths inside the archive.
//! * Stored entries resolve to zero-copy slices of the container's bytes;
//!   LZ4 entries decode once per mapper instance into a shared buffer.

#[cfg(feature = "compression")]
use std::sync::Arc;

#[cfg(feature = "compression")]
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::memory::MemoryView;
use crate::path;

use super::Mapper;

/// Archive magic identifier.
pub const MAGIC: &[u8; 4] = b"NPAK";

const HEADER_SIZE: usize = 0x10;
const ENTRY_SIZE: usize = 28;

const METHOD_STORE: u32 = 0;
const METHOD_LZ4: u32 = 1;

struct Entry {
    name: String,
    offset: u64,
    stored: u64,
    decoded: u32,
    method: u32,
}

/// Mapper over a PAK archive held in memory.
///
/// Construction parses and bounds-checks only the directory index; entry
/// data is untouched until [`resolve`](Mapper::resolve). The mapper keeps
/// the container's [`MemoryView`] alive, so an archive nested inside another
/// container pins its parent's backing for its own lifetime.
pub struct PakMapper {
    entries: Vec<Entry>,
    index: FxHashMap<String, usize>,
    /// View of the data section within the container bytes.
    data: MemoryView,
    /// Decoded payloads, filled lazily. Append-only: a racing first decode
    /// produces identical bytes and the first insert wins.
    #[cfg(feature = "compression")]
    decoded: RwLock<FxHashMap<usize, Arc<[u8]>>>,
}

impl PakMapper {
    /// Parse the archive index from `view`.
    ///
    /// Fails with [`Error::Corrupt`] if the magic is absent or any declared
    /// table or entry range falls outside the supplied bytes; nothing is
    /// ever read past the view.
    pub fn new(view: MemoryView) -> Result<Self> {
        let buf = view.as_slice();
        if buf.get(..4) != Some(&MAGIC[..]) {
            return Err(Error::Corrupt("missing NPAK magic"));
        }
        let count = le_u32(buf, 0x04)? as usize;
        let names_len = le_u32(buf, 0x08)? as usize;
        let _reserved = le_u32(buf, 0x0C)?;

        let table_end = count
            .checked_mul(ENTRY_SIZE)
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or(Error::Corrupt("declared table sizes overflow"))?;
        let names_end = table_end
            .checked_add(names_len)
            .ok_or(Error::Corrupt("declared table sizes overflow"))?;
        if names_end > buf.len() {
            return Err(Error::Corrupt("declared tables exceed archive size"));
        }
        let names = &buf[table_end..names_end];
        let data_len = (buf.len() - names_end) as u64;

        let mut entries = Vec::with_capacity(count);
        let mut index = FxHashMap::default();
        for i in 0..count {
            let at = HEADER_SIZE + i * ENTRY_SIZE;
            let entry = Entry {
                offset: le_u64(buf, at)?,
                stored: le_u64(buf, at + 0x08)?,
                decoded: le_u32(buf, at + 0x10)?,
                name: name_at(names, le_u32(buf, at + 0x14)? as usize)?,
                method: le_u32(buf, at + 0x18)?,
            };
            let end = entry
                .offset
                .checked_add(entry.stored)
                .ok_or(Error::Corrupt("entry range overflows"))?;
            if end > data_len {
                return Err(Error::Corrupt("entry data outside archive bounds"));
            }
            if entry.method == METHOD_STORE && entry.stored != u64::from(entry.decoded) {
                return Err(Error::Corrupt("stored entry with mismatched sizes"));
            }
            index.insert(path::normalize(&entry.name), i);
            entries.push(entry);
        }

        let data = view.slice(names_end, data_len as usize)?;
        Ok(Self {
            entries,
            index,
            data,
            #[cfg(feature = "compression")]
            decoded: RwLock::new(FxHashMap::default()),
        })
    }

    /// Registry factory for the `pak` extension.
    pub fn factory(view: MemoryView) -> Result<Box<dyn Mapper>> {
        Ok(Box::new(Self::new(view)?))
    }

    #[cfg(feature = "compression")]
    fn decode_lz4(&self, i: usize, entry: &Entry) -> Result<MemoryView> {
        if let Some(buf) = self.decoded.read().get(&i) {
            return Ok(MemoryView::from_arc(buf.clone()));
        }
        let raw = self.data.slice(entry.offset as usize, entry.stored as usize)?;
        let out = lz4_flex::decompress_size_prepended(raw.as_slice())
            .map_err(|_| Error::Corrupt("lz4 entry failed to decompress"))?;
        if out.len() != entry.decoded as usize {
            return Err(Error::Corrupt("lz4 entry decoded to unexpected size"));
        }
        let buf: Arc<[u8]> = out.into();
        let buf = self.decoded.write().entry(i).or_insert(buf).clone();
        Ok(MemoryView::from_arc(buf))
    }

    #[cfg(not(feature = "compression"))]
    fn decode_lz4(&self, _i: usize, _entry: &Entry) -> Result<MemoryView> {
        Err(Error::Unsupported(
            "lz4 entries require the 'compression' feature".into(),
        ))
    }
}

impl Mapper for PakMapper {
    fn exists(&self, name: &str) -> bool {
        self.index.contains_key(&path::normalize(name))
    }

    fn resolve(&self, name: &str) -> Result<MemoryView> {
        let key = path::normalize(name);
        let &i = self
            .index
            .get(&key)
            .ok_or(Error::EntryNotFound(key))?;
        let entry = &self.entries[i];
        match entry.method {
            METHOD_STORE => self.data.slice(entry.offset as usize, entry.stored as usize),
            METHOD_LZ4 => self.decode_lz4(i, entry),
            other => Err(Error::Unsupported(format!("unknown pak entry method {other}"))),
        }
    }

    fn enumerate(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.entries.iter().map(|e| e.name.clone()))
    }
}

fn le_u32(buf: &[u8], at: usize) -> Result<u32> {
    buf.get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(Error::Corrupt("header field out of bounds"))
}

fn le_u64(buf: &[u8], at: usize) -> Result<u64> {
    buf.get(at..at + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(Error::Corrupt("header field out of bounds"))
}

fn name_at(table: &[u8], at: usize) -> Result<String> {
    let rest = table
        .get(at..)
        .ok_or(Error::Corrupt("entry name offset out of bounds"))?;
    let end = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Corrupt("unterminated entry name"))?;
    std::str::from_utf8(&rest[..end])
        .map(str::to_owned)
        .map_err(|_| Error::Corrupt("entry name is not valid utf-8"))
}

/// Build an archive image for tests: `(name, contents, method)` per entry.
#[cfg(test)]
pub(crate) fn build_pak(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut table = Vec::new();
    let mut names = Vec::new();
    let mut data = Vec::new();
    for &(name, bytes, method) in entries {
        let name_off = names.len() as u32;
        names.extend_from_slice(name.as_bytes());
        names.push(0);

        let stored: Vec<u8> = match method {
            #[cfg(feature = "compression")]
            METHOD_LZ4 => lz4_flex::compress_prepend_size(bytes),
            _ => bytes.to_vec(),
        };
        table.extend_from_slice(&(data.len() as u64).to_le_bytes());
        table.extend_from_slice(&(stored.len() as u64).to_le_bytes());
        table.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        table.extend_from_slice(&name_off.to_le_bytes());
        table.extend_from_slice(&method.to_le_bytes());
        data.extend_from_slice(&stored);
    }

    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    out.extend_from_slice(&(names.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&table);
    out.extend_from_slice(&names);
    out.extend_from_slice(&data);
    out
}
