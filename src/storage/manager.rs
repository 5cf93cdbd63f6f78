//! Storage Manager
//!
//! Manages the SSTables of one embedded partition and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Merge every SSTable into one view for cursor snapshots

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::memtable::{MemTable, MemTableEntry};

use super::sstable::{self, SSTable, SSTableBuilder, SSTableReader};

/// Merged view of the SSTables: `None` marks a tombstone
pub type MergedEntries = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock (reads take the write side because
///   `SSTableReader` seeks its file handle)
/// - `next_sstable_id`: Atomic counter (lock-free)
pub struct StorageManager {
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    next_sstable_id: AtomicU64,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing SSTable files
    /// 3. Open readers for each (loads indexes into RAM)
    /// 4. Order by ID descending (newest first)
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = sstable::parse_file_id(&file_path) {
                    sstable_ids.push(id);
                }
            }
        }

        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let sstables = sstable_ids
            .iter()
            .map(|id| SSTableReader::open(&sstable::file_path(path, *id)))
            .collect::<Result<Vec<_>>>()?;

        let next_id = sstable_ids.first().map_or(1, |&id| id + 1);

        debug!(dir = %path.display(), sstables = sstables.len(), "opened SSTable storage");

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key not found, or found tombstone (deleted)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut sstables = self.sstables.write();

        for reader in sstables.iter_mut() {
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key) {
                Ok(found) => return Ok(found),
                Err(LedgerError::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// Creates a new SSTable file from the MemTable's sorted entries,
    /// opens a reader for it, and adds it to the front of the list.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(LedgerError::BackendIo(
                "cannot flush an empty MemTable".to_string(),
            ));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = sstable::file_path(&self.data_dir, id);

        let written = Self::write_sstable(&path, memtable)
            .and_then(|metadata| Ok((metadata, SSTableReader::open(&path)?)));
        let (metadata, reader) = match written {
            Ok(written) => written,
            Err(e) => {
                // A half-written file would fail to open on the next startup
                let _ = fs::remove_file(&path);
                return Err(e);
            }
        };
        self.sstables.write().insert(0, reader);

        debug!(
            sstable = %path.display(),
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "flushed memtable"
        );

        Ok(metadata)
    }

    fn write_sstable(path: &Path, memtable: &MemTable) -> Result<SSTable> {
        let mut builder = SSTableBuilder::new(path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        builder.finish()
    }

    /// Merge every SSTable oldest → newest so newer entries win
    ///
    /// Tombstones are kept (as `None`) so a caller can overlay them on top of
    /// older data or drop them.
    pub fn scan(&self) -> Result<MergedEntries> {
        let mut sstables = self.sstables.write();
        let mut merged = MergedEntries::new();

        for reader in sstables.iter_mut().rev() {
            for item in reader.iter()? {
                let (key, value) = item?;
                merged.insert(key, value);
            }
        }

        Ok(merged)
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Bytes occupied by all SSTable files
    pub fn total_bytes(&self) -> u64 {
        self.sstables.read().iter().map(SSTableReader::file_size).sum()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }
}
