//! StorageFacade
//!
//! Top-level handle: the default partition plus the registry of named
//! partitions, with the full CRUD and batch-commit surface.

use std::sync::Arc;

use tracing::{info, warn};

use crate::batch::BatchSet;
use crate::config::Config;
use crate::cursor::Cursor;
use crate::error::{LedgerError, Result};
use crate::partition::{Partition, PartitionRegistry, DEFAULT_ORDINAL, DEFAULT_PARTITION};
use crate::view::ByteView;

/// Storage entry point shared by the consensus pipeline's threads
pub struct StorageFacade {
    config: Config,
    default_partition: Arc<Partition>,
    registry: PartitionRegistry,
}

impl StorageFacade {
    /// Open the default partition with the configured backend
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let default_partition = Arc::new(Partition::open(
            &config,
            DEFAULT_PARTITION,
            DEFAULT_ORDINAL,
        )?);

        info!(
            backend = %config.backend,
            data_dir = %config.data_dir.display(),
            "storage facade opened"
        );

        Ok(Self {
            registry: PartitionRegistry::new(config.clone()),
            config,
            default_partition,
        })
    }

    /// Destroy every remaining partition and the default one
    ///
    /// All partitions are attempted; the first failure is returned.
    pub fn close(self) -> Result<()> {
        let mut first_error = None;

        let partitions = self.registry.drain();
        for partition in partitions.iter().chain(std::iter::once(&self.default_partition)) {
            if partition.is_destroyed() {
                continue;
            }
            if let Err(e) = partition.destroy() {
                warn!(partition = %partition.name(), error = %e, "failed to destroy partition on close");
                first_error.get_or_insert(e);
            }
        }

        info!("storage facade closed");
        first_error.map_or(Ok(()), Err)
    }

    // =========================================================================
    // Partitions
    // =========================================================================

    pub fn create_partition(&self, name: &str) -> Result<Arc<Partition>> {
        self.registry.create_partition(name)
    }

    /// Unregister a partition; call [`Partition::destroy`] on the returned
    /// handle to release its backend
    pub fn drop_partition(&self, partition: &Partition) -> Result<Arc<Partition>> {
        self.registry.drop_partition(partition)
    }

    /// Look up a partition by name (the default one included)
    pub fn partition(&self, name: &str) -> Option<Arc<Partition>> {
        if name == DEFAULT_PARTITION {
            return Some(Arc::clone(&self.default_partition));
        }
        self.registry.get(name)
    }

    pub fn default_partition(&self) -> &Arc<Partition> {
        &self.default_partition
    }

    pub fn registry(&self) -> &PartitionRegistry {
        &self.registry
    }

    /// Byte footprint of the default partition
    pub fn get_size(&self) -> Result<u64> {
        self.default_partition.size_bytes()
    }

    // =========================================================================
    // Single-key operations
    // =========================================================================

    pub fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        partition.put(key, value)
    }

    /// Value under `key`; `NotFound` if absent
    pub fn get(&self, partition: &Partition, key: &[u8]) -> Result<ByteView<'static>> {
        partition.get(key)?.ok_or(LedgerError::NotFound)
    }

    pub fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()> {
        partition.delete(key)
    }

    pub fn exists(&self, partition: &Partition, key: &[u8]) -> Result<bool> {
        partition.exists(key)
    }

    pub fn new_cursor(&self, partition: &Partition) -> Result<Cursor> {
        partition.new_cursor()
    }

    // =========================================================================
    // Batches
    // =========================================================================

    pub fn new_write_batch(&self) -> BatchSet {
        BatchSet::new()
    }

    /// Commit `batch`, atomically per partition
    ///
    /// See [`crate::batch`] for the cross-partition contract.
    pub fn write(&self, batch: &BatchSet) -> Result<()> {
        batch.commit(|name| self.partition(name))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
