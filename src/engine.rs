//! Engine Module
//!
//! The embedded SSTable engine that backs one embedded partition.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Handle concurrent read/write access
//! - Trigger flushes when MemTable is full
//! - Manage crash recovery on startup
//! - Apply write batches atomically
//! - Produce merged snapshots for cursors

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::StorageManager;
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Buffered mutations for one embedded partition
///
/// Committed through [`Engine::write_batch`] as a single WAL record.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    ops: Vec<Operation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.ops.push(Operation::Delete { key: key.to_vec() });
    }

    /// Drop buffered operations, keeping the allocation
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }
}

/// The embedded storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/batch/flush): Serialized by `write_lock`
///   - Must acquire: write_lock → WAL → memtable → storage
///
/// - **Reads** (get): Concurrent at MemTable level
///   - MemTable uses an internal RwLock
///   - SSTable reads serialize inside StorageManager (file seeking)
///
/// - **Snapshots** take `write_lock` so a concurrent flush cannot move
///   entries between the memtable and a new SSTable mid-merge.
pub struct Engine {
    config: Config,

    /// Directory for SSTables
    storage_dir: PathBuf,

    wal: Mutex<WalWriter>,

    memtable: MemTable,

    storage: StorageManager,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine in `config.data_dir`
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load existing SSTables
    /// 3. Replay the WAL into the memtable and flush it to an SSTable
    /// 4. Truncate the WAL
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let storage_dir = config.data_dir.join(Self::SSTABLE_DIR);
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&storage_dir)?;
        let memtable = MemTable::new();

        let recovered = if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;

            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                info!(
                    dir = %config.data_dir.display(),
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    "WAL recovery"
                );
            }

            for entry in &entries {
                memtable.apply(&entry.operation);
            }

            // Make replayed data durable before the log is discarded
            if !memtable.is_empty() {
                debug!(entries = memtable.entry_count(), "flushing recovered entries");
                storage.flush(&memtable)?;
                memtable.clear();
            }
            true
        } else {
            false
        };

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        if recovered {
            wal.truncate()?;
        }

        info!(
            dir = %config.data_dir.display(),
            sstables = storage.sstable_count(),
            "embedded engine opened"
        );

        Ok(Self {
            config,
            storage_dir,
            wal: Mutex::new(wal),
            memtable,
            storage,
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (default config with the specified data directory)
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(Some(value)),
                MemTableEntry::Tombstone => Ok(None),
            };
        }

        self.storage.get(key)
    }

    /// Check whether a live value exists for `key`
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Put a key-value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_value(value)?;
        self.log_and_apply(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Delete a key (absent keys are not an error)
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.log_and_apply(Operation::Delete { key: key.to_vec() })
    }

    /// Apply every operation of `batch`, or none of them
    ///
    /// The batch is validated up front, logged as one WAL record, and applied
    /// to the memtable under a single lock.
    pub fn write_batch(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        for op in batch.operations() {
            if let Operation::Put { value, .. } = op {
                self.check_value(value)?;
            }
        }

        self.log_and_apply(Operation::Batch(batch.operations().to_vec()))
    }

    /// Write-path core: write lock → WAL → memtable → maybe flush
    ///
    /// Once the WAL append succeeds the write is acknowledged. A failed
    /// auto-flush leaves the data in the memtable and WAL and is retried on
    /// the next write, `flush` or `close`.
    fn log_and_apply(&self, operation: Operation) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        // WAL first (durability guarantee)
        self.wal.lock().append(operation.clone())?;

        let new_size = self.memtable.apply(&operation);

        if new_size >= self.config.memtable_size_limit {
            if let Err(e) = self.flush_internal() {
                warn!(
                    dir = %self.config.data_dir.display(),
                    error = %e,
                    "memtable flush failed, keeping entries in memory"
                );
            }
        }

        Ok(())
    }

    fn check_value(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.config.max_value_size {
            return Err(LedgerError::ValueTooLarge {
                size: value.len(),
                limit: self.config.max_value_size,
            });
        }
        Ok(())
    }

    /// Merged view of all live entries, sorted by key
    ///
    /// Memtable entries shadow SSTable entries; tombstoned keys are dropped.
    pub fn snapshot(&self) -> Result<Vec<(Bytes, Bytes)>> {
        let _write_guard = self.write_lock.lock();

        let mut merged = self.storage.scan()?;
        for (key, entry) in self.memtable.iter() {
            let value = match entry {
                MemTableEntry::Value(v) => Some(v),
                MemTableEntry::Tombstone => None,
            };
            merged.insert(key, value);
        }

        Ok(merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (Bytes::from(k), Bytes::from(v))))
            .collect())
    }

    /// Flush memtable to disk regardless of its size
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Called with write lock held
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();

        // Entries are now durable in the SSTable
        self.wal.lock().truncate()?;

        Ok(())
    }

    /// Flush pending data and sync the WAL
    pub fn close(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()?;
        self.wal.lock().sync()?;

        debug!(dir = %self.config.data_dir.display(), "embedded engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Approximate byte footprint: memtable plus SSTable files
    pub fn size_bytes(&self) -> u64 {
        self.memtable.size() as u64 + self.storage.total_bytes()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
