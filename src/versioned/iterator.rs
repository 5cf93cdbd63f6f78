//! Managed iterator over a versioned store

use std::sync::Arc;

use crate::error::{LedgerError, Result};

use super::VersionedStore;

/// Iterator materialized at one store version
///
/// Positioning past either end leaves it invalid. Reading or stepping an
/// invalid iterator fails immediately. Must be released exactly once;
/// `release` after release fails, dropping an unreleased iterator releases it.
pub struct VersionedIterator {
    store: Arc<VersionedStore>,
    version: u64,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    position: Option<usize>,
    released: bool,
}

impl VersionedIterator {
    pub(super) fn new(
        store: Arc<VersionedStore>,
        version: u64,
        entries: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Self {
        Self {
            store,
            version,
            entries,
            position: None,
            released: false,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.released {
            return Err(LedgerError::UseAfterClose("versioned iterator"));
        }
        Ok(())
    }

    fn current(&self) -> Result<usize> {
        self.ensure_live()?;
        self.position.ok_or_else(|| {
            LedgerError::BackendIo("versioned iterator is not positioned".to_string())
        })
    }

    /// Version the iterator was materialized at
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn valid(&self) -> bool {
        !self.released && self.position.is_some()
    }

    /// Copy of the current key
    pub fn key(&self) -> Result<Vec<u8>> {
        let pos = self.current()?;
        Ok(self.entries[pos].0.clone())
    }

    /// Copy of the current value
    pub fn value(&self) -> Result<Vec<u8>> {
        let pos = self.current()?;
        Ok(self.entries[pos].1.clone())
    }

    pub fn next(&mut self) -> Result<()> {
        let pos = self.current()?;
        self.position = Some(pos + 1).filter(|&p| p < self.entries.len());
        Ok(())
    }

    pub fn prev(&mut self) -> Result<()> {
        let pos = self.current()?;
        self.position = pos.checked_sub(1);
        Ok(())
    }

    pub fn seek_to_first(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.position = if self.entries.is_empty() { None } else { Some(0) };
        Ok(())
    }

    pub fn seek_to_last(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.position = self.entries.len().checked_sub(1);
        Ok(())
    }

    /// Position at the first key ≥ `target` in store order
    pub fn seek(&mut self, target: &[u8]) -> Result<()> {
        self.ensure_live()?;
        let idx = self
            .entries
            .partition_point(|(k, _)| k.as_slice() < target);
        self.position = Some(idx).filter(|&i| i < self.entries.len());
        Ok(())
    }

    /// Hand the iterator back to its store
    pub fn release(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.released = true;
        self.position = None;
        self.entries = Vec::new();
        self.store.iterator_released();
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for VersionedIterator {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            self.store.iterator_released();
        }
    }
}
