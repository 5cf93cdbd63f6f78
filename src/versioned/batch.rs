//! Versioned write batch

/// One buffered mutation
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BatchEntry {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Managed batch object for the versioned store
///
/// Applied by [`VersionedStore::write`](super::VersionedStore::write) as a
/// single new version.
#[derive(Debug, Default, Clone)]
pub struct VersionedBatch {
    entries: Vec<BatchEntry>,
}

impl VersionedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.entries.push(BatchEntry::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.entries.push(BatchEntry::Delete { key: key.to_vec() });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }
}
