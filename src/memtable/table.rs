//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::wal::Operation;

use super::MemTableEntry;

/// In-memory table for recent writes
///
/// Size is the sum of key and value lengths of the entries currently held
/// (a tombstone counts its key only).
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, MemTableEntry>>,
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get an entry by key (read lock)
    ///
    /// `Some(Tombstone)` means the key was deleted since the last flush.
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair (write lock); returns the new size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let mut data = self.data.write();
        Self::insert_locked(&mut data, &self.size, key, MemTableEntry::Value(value));
        self.size.load(Ordering::SeqCst)
    }

    /// Delete a key (write lock, inserts tombstone); returns the new size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        let mut data = self.data.write();
        Self::insert_locked(&mut data, &self.size, key, MemTableEntry::Tombstone);
        self.size.load(Ordering::SeqCst)
    }

    /// Apply a logged operation under a single write lock; returns the new size
    ///
    /// Readers observe either none or all of a batch.
    pub fn apply(&self, operation: &Operation) -> usize {
        let mut data = self.data.write();
        Self::apply_locked(&mut data, &self.size, operation);
        self.size.load(Ordering::SeqCst)
    }

    fn apply_locked(
        data: &mut BTreeMap<Vec<u8>, MemTableEntry>,
        size: &AtomicUsize,
        operation: &Operation,
    ) {
        match operation {
            Operation::Put { key, value } => Self::insert_locked(
                data,
                size,
                key.clone(),
                MemTableEntry::Value(value.clone()),
            ),
            Operation::Delete { key } => {
                Self::insert_locked(data, size, key.clone(), MemTableEntry::Tombstone)
            }
            Operation::Batch(ops) => {
                for op in ops {
                    Self::apply_locked(data, size, op);
                }
            }
        }
    }

    fn insert_locked(
        data: &mut BTreeMap<Vec<u8>, MemTableEntry>,
        size: &AtomicUsize,
        key: Vec<u8>,
        entry: MemTableEntry,
    ) {
        let key_len = key.len();
        let payload_len = entry.payload_len();
        match data.insert(key, entry) {
            Some(old) => {
                // Key already counted; swap old payload for new
                size.fetch_add(payload_len, Ordering::SeqCst);
                size.fetch_sub(old.payload_len(), Ordering::SeqCst);
            }
            None => {
                size.fetch_add(key_len + payload_len, Ordering::SeqCst);
            }
        }
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    /// Get entry count (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Get an iterator over all entries (for flush)
    /// Returns a sorted copy taken under the read lock
    pub fn iter(&self) -> MemTableIterator {
        let entries: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        MemTableIterator {
            inner: entries.into_iter(),
        }
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
        self.size.store(0, Ordering::SeqCst);
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over MemTable entries in sorted key order
pub struct MemTableIterator {
    inner: std::vec::IntoIter<(Vec<u8>, MemTableEntry)>,
}

impl Iterator for MemTableIterator {
    type Item = (Vec<u8>, MemTableEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
