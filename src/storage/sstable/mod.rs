//! SSTable Module
//!
//! Immutable sorted files holding flushed memtables of one embedded partition.
//!
//! ## Layout
//! All integers are little-endian.
//!
//! | Section | Contents                                                   |
//! |---------|------------------------------------------------------------|
//! | header  | `b"LKVS"`, format version `u16`, entry count `u64`         |
//! | data    | per entry: key len `u32`, value len `u32`, key, value      |
//! | index   | per entry: key len `u32`, data offset `u64`, key           |
//! | footer  | index offset `u64`, CRC32 of the data block `u32`, 4 zeros |
//!
//! A value length of `u32::MAX` marks a tombstone and carries no value bytes.
//! Files are named `sstable_{id:06}.sst`; a higher id is a newer file.

mod builder;
mod iterator;
mod reader;

use std::path::{Path, PathBuf};

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::SSTableReader;

pub(crate) const MAGIC: &[u8; 4] = b"LKVS";

pub(crate) const VERSION: u16 = 1;

/// magic (4) + version (2) + entry count (8)
pub(crate) const HEADER_SIZE: u64 = 14;

/// index offset (8) + data CRC (4) + padding (4)
pub(crate) const FOOTER_SIZE: u64 = 16;

pub(crate) const TOMBSTONE_MARKER: u32 = u32::MAX;

pub(crate) fn le_u32(bytes: &[u8], pos: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[pos..pos + 4]);
    u32::from_le_bytes(buf)
}

pub(crate) fn le_u64(bytes: &[u8], pos: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[pos..pos + 8]);
    u64::from_le_bytes(buf)
}

/// Path of SSTable `id` inside `dir`
pub(crate) fn file_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("sstable_{:06}.sst", id))
}

/// "sstable_000042.sst" → Some(42); anything else → None
pub(crate) fn parse_file_id(path: &Path) -> Option<u64> {
    if path.extension()? != "sst" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("sstable_")?.parse().ok()
}

/// What a finished [`SSTableBuilder`] wrote
#[derive(Debug, Clone)]
pub struct SSTable {
    pub path: PathBuf,
    /// Entries written, tombstones included
    pub entry_count: u64,
    pub min_key: Vec<u8>,
    pub max_key: Vec<u8>,
    pub file_size: u64,
}

impl SSTable {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// False when `key` is outside `[min_key, max_key]` or the file is empty
    pub fn might_contain(&self, key: &[u8]) -> bool {
        self.entry_count > 0 && key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}
