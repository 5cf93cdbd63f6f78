//! BatchSet
//!
//! Grouped mutations across partitions, applied on commit.
//!
//! ## Atomicity boundary
//! Each partition's buffered mutations are applied all-or-nothing. Across
//! partitions there is no atomicity: every partition is attempted on its own,
//! earlier successes stay durable when a later partition fails, and nothing
//! is rolled back. The caller learns which partitions landed from
//! [`LedgerError::PartialCommit`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::partition::{Partition, PartitionBatch};

/// Buffer of pending mutations keyed by partition name
///
/// Single-owner: mutate it from one thread, or lock around it.
#[derive(Debug, Default)]
pub struct BatchSet {
    updates: BTreeMap<String, PartitionBatch>,
    destroyed: bool,
}

impl BatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.destroyed {
            return Err(LedgerError::UseAfterClose("batch set"));
        }
        Ok(())
    }

    /// Batch object for `partition`, allocated on first touch
    fn batch_for(&mut self, partition: &Partition) -> Result<&mut PartitionBatch> {
        self.ensure_live()?;

        let kind = partition.backend_kind();
        let batch = self
            .updates
            .entry(partition.name().to_string())
            .or_insert_with(|| PartitionBatch::for_backend(kind));

        if batch.kind() != kind {
            return Err(LedgerError::InvalidOperation(format!(
                "partition {:?} already buffers a {} batch, not {}",
                partition.name(),
                batch.kind(),
                kind
            )));
        }
        Ok(batch)
    }

    /// Buffer a put against `partition`
    pub fn put(&mut self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        self.batch_for(partition)?.put(key, value);
        Ok(())
    }

    /// Buffer a delete against `partition`
    pub fn delete(&mut self, partition: &Partition, key: &[u8]) -> Result<()> {
        self.batch_for(partition)?.delete(key);
        Ok(())
    }

    /// Empty every buffer; the per-partition batch objects are kept
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_live()?;
        for batch in self.updates.values_mut() {
            batch.clear();
        }
        Ok(())
    }

    /// Release every batch object; the set is unusable afterwards
    pub fn destroy(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.destroyed = true;
        self.updates.clear();
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Buffered mutations across all partitions
    pub fn len(&self) -> usize {
        self.updates.values().map(PartitionBatch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Partitions that have a batch object, sorted
    pub fn partition_names(&self) -> Vec<String> {
        self.updates.keys().cloned().collect()
    }

    /// Apply each partition's batch, resolving names through `resolve`
    ///
    /// Every partition is attempted even after a failure.
    pub(crate) fn commit<F>(&self, resolve: F) -> Result<()>
    where
        F: Fn(&str) -> Option<Arc<Partition>>,
    {
        self.ensure_live()?;

        let mut committed = Vec::new();
        let mut failed = Vec::new();

        for (name, batch) in &self.updates {
            let outcome = match resolve(name) {
                Some(partition) => partition.apply_batch(batch),
                None => Err(LedgerError::UnknownPartition(name.clone())),
            };

            match outcome {
                Ok(()) => committed.push(name.clone()),
                Err(e) => failed.push((name.clone(), e.to_string())),
            }
        }

        if failed.is_empty() {
            debug!(partitions = committed.len(), mutations = self.len(), "batch committed");
            return Ok(());
        }

        warn!(?committed, ?failed, "batch partially committed");
        Err(LedgerError::PartialCommit { committed, failed })
    }
}
