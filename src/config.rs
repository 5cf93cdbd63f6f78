//! Configuration for ledgerkv
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;

use crate::error::{LedgerError, Result};

/// Which backing engine a storage facade (and all of its partitions) uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process SSTable engine (WAL + MemTable + SSTables)
    Embedded,

    /// Version-tracked store reached through managed object handles
    Versioned,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Embedded => f.write_str("embedded"),
            BackendKind::Versioned => f.write_str("versioned"),
        }
    }
}

/// Main configuration for a ledgerkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files.
    /// Internal structure (embedded backend only):
    ///   {data_dir}/
    ///     ├── default/         (default partition)
    ///     │   ├── wal.log
    ///     │   └── sstables/
    ///     └── {partition}/     (one directory per named partition)
    pub data_dir: PathBuf,

    /// Backend used for the default partition and every created partition
    pub backend: BackendKind,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    // -------------------------------------------------------------------------
    // Limits
    // -------------------------------------------------------------------------
    /// Largest value either backend accepts (in bytes)
    pub max_value_size: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./ledgerkv_data"),
            backend: BackendKind::Embedded,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 64 * 1024 * 1024, // 64 MB
            max_value_size: 16 * 1024 * 1024,      // 16 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engines cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.memtable_size_limit == 0 {
            return Err(LedgerError::Config(
                "memtable_size_limit must be greater than zero".to_string(),
            ));
        }

        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(LedgerError::Config(
                "EveryNEntries sync count must be greater than zero".to_string(),
            ));
        }

        // u32::MAX is the SSTable tombstone marker
        if self.max_value_size >= u32::MAX as usize {
            return Err(LedgerError::Config(format!(
                "max_value_size must be below {} bytes",
                u32::MAX
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Select the backing engine
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set the largest accepted value (in bytes)
    pub fn max_value_size(mut self, size: usize) -> Self {
        self.config.max_value_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
