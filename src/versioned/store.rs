//! Versioned store implementation

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};

use super::batch::BatchEntry;
use super::{VersionedBatch, VersionedIterator};

/// One recorded version of a key; `value == None` is a deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub version: u64,
    pub value: Option<Vec<u8>>,
}

#[derive(Default)]
struct State {
    /// key → versions, oldest first
    keys: BTreeMap<Vec<u8>, Vec<Version>>,
    latest_version: u64,
    /// Bytes of every key plus every retained value
    footprint: u64,
}

impl State {
    fn record(&mut self, key: &[u8], version: u64, value: Option<Vec<u8>>) {
        self.footprint += value.as_ref().map_or(0, |v| v.len() as u64);
        match self.keys.get_mut(key) {
            Some(history) => history.push(Version { version, value }),
            None => {
                self.footprint += key.len() as u64;
                self.keys.insert(key.to_vec(), vec![Version { version, value }]);
            }
        }
    }

    fn live_value(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.keys
            .get(key)
            .and_then(|history| history.last())
            .and_then(|v| v.value.as_ref())
    }
}

/// Version-tracked key-value store
///
/// One instance backs one versioned partition; `id` is the partition ordinal
/// it was created for.
pub struct VersionedStore {
    id: u32,
    max_value_size: usize,
    state: RwLock<State>,
    live_iterators: AtomicUsize,
    released: AtomicBool,
}

impl VersionedStore {
    /// Create an empty store
    pub fn new(id: u32, max_value_size: usize) -> Self {
        info!(id, "versioned store opened");
        Self {
            id,
            max_value_size,
            state: RwLock::new(State::default()),
            live_iterators: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    fn ensure_open(&self) -> Result<()> {
        if self.released.load(Ordering::SeqCst) {
            return Err(LedgerError::UseAfterClose("versioned store"));
        }
        Ok(())
    }

    fn check_value(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.max_value_size {
            return Err(LedgerError::ValueTooLarge {
                size: value.len(),
                limit: self.max_value_size,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Mutations (each returns the version it produced)
    // =========================================================================

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<u64> {
        self.ensure_open()?;
        self.check_value(value)?;

        let mut state = self.state.write();
        state.latest_version += 1;
        let version = state.latest_version;
        state.record(key, version, Some(value.to_vec()));
        Ok(version)
    }

    /// Record a deletion (absent keys are not an error)
    pub fn delete(&self, key: &[u8]) -> Result<u64> {
        self.ensure_open()?;

        let mut state = self.state.write();
        state.latest_version += 1;
        let version = state.latest_version;
        state.record(key, version, None);
        Ok(version)
    }

    /// Apply a batch as one version, all-or-nothing
    ///
    /// An empty batch produces no version and returns the current one.
    pub fn write(&self, batch: &VersionedBatch) -> Result<u64> {
        self.ensure_open()?;

        for entry in batch.entries() {
            if let BatchEntry::Put { value, .. } = entry {
                self.check_value(value)?;
            }
        }

        let mut state = self.state.write();
        if batch.is_empty() {
            return Ok(state.latest_version);
        }

        state.latest_version += 1;
        let version = state.latest_version;
        for entry in batch.entries() {
            match entry {
                BatchEntry::Put { key, value } => state.record(key, version, Some(value.clone())),
                BatchEntry::Delete { key } => state.record(key, version, None),
            }
        }

        debug!(id = self.id, version, mutations = batch.len(), "versioned batch applied");
        Ok(version)
    }

    // =========================================================================
    // Reads (copies)
    // =========================================================================

    /// Newest live value of `key`
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.state.read().live_value(key).cloned())
    }

    /// Value of `key` as of `version`
    pub fn get_at(&self, key: &[u8], version: u64) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;
        let state = self.state.read();
        Ok(state
            .keys
            .get(key)
            .and_then(|history| history.iter().rev().find(|v| v.version <= version))
            .and_then(|v| v.value.clone()))
    }

    /// Every recorded version of `key`, oldest first
    pub fn history(&self, key: &[u8]) -> Result<Vec<Version>> {
        self.ensure_open()?;
        Ok(self.state.read().keys.get(key).cloned().unwrap_or_default())
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.state.read().live_value(key).is_some())
    }

    pub fn latest_version(&self) -> u64 {
        self.state.read().latest_version
    }

    /// Bytes held by keys and all retained versions
    pub fn size(&self) -> u64 {
        self.state.read().footprint
    }

    // =========================================================================
    // Managed handles
    // =========================================================================

    /// Materialize an iterator over the live entries at the current version
    pub fn new_iterator(self: &Arc<Self>) -> Result<VersionedIterator> {
        self.ensure_open()?;

        let (version, entries) = {
            let state = self.state.read();
            let entries: Vec<(Vec<u8>, Vec<u8>)> = state
                .keys
                .iter()
                .filter_map(|(k, history)| {
                    history
                        .last()
                        .and_then(|v| v.value.as_ref())
                        .map(|v| (k.clone(), v.clone()))
                })
                .collect();
            (state.latest_version, entries)
        };

        self.live_iterators.fetch_add(1, Ordering::SeqCst);
        Ok(VersionedIterator::new(Arc::clone(self), version, entries))
    }

    /// Iterators handed out and not yet released
    pub fn live_iterators(&self) -> usize {
        self.live_iterators.load(Ordering::SeqCst)
    }

    pub(super) fn iterator_released(&self) {
        self.live_iterators.fetch_sub(1, Ordering::SeqCst);
    }

    /// Release the store's data; every later call fails with `UseAfterClose`
    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Err(LedgerError::UseAfterClose("versioned store"));
        }

        let mut state = self.state.write();
        state.keys.clear();
        state.footprint = 0;

        debug!(
            id = self.id,
            live_iterators = self.live_iterators(),
            "versioned store released"
        );
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}
