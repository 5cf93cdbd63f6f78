//! Partitions and the partition registry
//!
//! A partition is one keyspace inside one backend instance. The registry
//! owns the name → partition mapping and hands out ordinals.
//!
//! ## Two-phase removal
//! Dropping a partition is split in two:
//! 1. [`PartitionRegistry::drop_partition`] unregisters the name and returns
//!    the handle.
//! 2. [`Partition::destroy`] releases the backend.
//!
//! Between the two steps the handle stays fully usable, so a commit that
//! already holds the `Arc<Partition>` can finish. The name cannot be reused
//! until the handle is destroyed or dropped: an embedded backend still owns
//! the partition's directory until then.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::{BackendKind, Config};
use crate::cursor::{Cursor, EmbeddedCursor};
use crate::engine::{Engine, WriteBatch};
use crate::error::{LedgerError, Result};
use crate::versioned::{VersionedBatch, VersionedStore};
use crate::view::ByteView;

/// Name of the partition every facade opens implicitly
pub const DEFAULT_PARTITION: &str = "default";

/// Ordinal of the default partition
pub const DEFAULT_ORDINAL: u32 = 0;

/// Backend instance behind one partition
pub(crate) enum PartitionBackend {
    Embedded(Engine),
    Versioned(Arc<VersionedStore>),
}

impl PartitionBackend {
    /// Open the backend for partition `name` with the given ordinal
    pub(crate) fn open(config: &Config, name: &str, ordinal: u32) -> Result<Self> {
        match config.backend {
            BackendKind::Embedded => {
                let mut engine_config = config.clone();
                engine_config.data_dir = config.data_dir.join(name);
                Ok(PartitionBackend::Embedded(Engine::open(engine_config)?))
            }
            BackendKind::Versioned => Ok(PartitionBackend::Versioned(Arc::new(
                VersionedStore::new(ordinal, config.max_value_size),
            ))),
        }
    }

    fn kind(&self) -> BackendKind {
        match self {
            PartitionBackend::Embedded(_) => BackendKind::Embedded,
            PartitionBackend::Versioned(_) => BackendKind::Versioned,
        }
    }
}

/// Per-partition buffered batch, matching the partition's backend
#[derive(Debug, Clone)]
pub(crate) enum PartitionBatch {
    Embedded(WriteBatch),
    Versioned(VersionedBatch),
}

impl PartitionBatch {
    pub(crate) fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Embedded => PartitionBatch::Embedded(WriteBatch::new()),
            BackendKind::Versioned => PartitionBatch::Versioned(VersionedBatch::new()),
        }
    }

    pub(crate) fn kind(&self) -> BackendKind {
        match self {
            PartitionBatch::Embedded(_) => BackendKind::Embedded,
            PartitionBatch::Versioned(_) => BackendKind::Versioned,
        }
    }

    pub(crate) fn put(&mut self, key: &[u8], value: &[u8]) {
        match self {
            PartitionBatch::Embedded(b) => b.put(key, value),
            PartitionBatch::Versioned(b) => b.put(key, value),
        }
    }

    pub(crate) fn delete(&mut self, key: &[u8]) {
        match self {
            PartitionBatch::Embedded(b) => b.delete(key),
            PartitionBatch::Versioned(b) => b.delete(key),
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            PartitionBatch::Embedded(b) => b.clear(),
            PartitionBatch::Versioned(b) => b.clear(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            PartitionBatch::Embedded(b) => b.len(),
            PartitionBatch::Versioned(b) => b.len(),
        }
    }
}

/// Open handle to one keyspace
pub struct Partition {
    name: String,
    ordinal: u32,
    kind: BackendKind,
    /// `None` once destroyed
    backend: RwLock<Option<PartitionBackend>>,
}

impl Partition {
    pub(crate) fn open(config: &Config, name: &str, ordinal: u32) -> Result<Self> {
        let backend = PartitionBackend::open(config, name, ordinal)?;
        Ok(Self {
            name: name.to_string(),
            ordinal,
            kind: backend.kind(),
            backend: RwLock::new(Some(backend)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-lifetime unique ordinal (0 for the default partition)
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    pub fn is_destroyed(&self) -> bool {
        self.backend.read().is_none()
    }

    /// Run `f` against the live backend
    fn with_backend<T>(&self, f: impl FnOnce(&PartitionBackend) -> Result<T>) -> Result<T> {
        let guard = self.backend.read();
        let backend = guard
            .as_ref()
            .ok_or(LedgerError::UseAfterClose("partition"))?;
        f(backend)
    }

    /// Value stored under `key`, `None` if absent
    pub fn get(&self, key: &[u8]) -> Result<Option<ByteView<'static>>> {
        self.with_backend(|backend| match backend {
            PartitionBackend::Embedded(engine) => {
                Ok(engine.get(key)?.map(ByteView::embedded_owned))
            }
            PartitionBackend::Versioned(store) => Ok(store.get(key)?.map(ByteView::external)),
        })
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_backend(|backend| match backend {
            PartitionBackend::Embedded(engine) => engine.put(key, value),
            PartitionBackend::Versioned(store) => store.put(key, value).map(|_| ()),
        })
    }

    /// Remove `key`; absent keys are not an error
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.with_backend(|backend| match backend {
            PartitionBackend::Embedded(engine) => engine.delete(key),
            PartitionBackend::Versioned(store) => store.delete(key).map(|_| ()),
        })
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.with_backend(|backend| match backend {
            PartitionBackend::Embedded(engine) => engine.exists(key),
            PartitionBackend::Versioned(store) => store.exists(key),
        })
    }

    /// Open a cursor over the partition's current state
    ///
    /// An embedded snapshot that cannot be read yields a cursor that is never
    /// valid and reports the failure through [`Cursor::error`].
    pub fn new_cursor(&self) -> Result<Cursor> {
        self.with_backend(|backend| match backend {
            PartitionBackend::Embedded(engine) => Ok(Cursor::embedded(match engine.snapshot() {
                Ok(entries) => EmbeddedCursor::new(entries),
                Err(e) => EmbeddedCursor::failed(e),
            })),
            PartitionBackend::Versioned(store) => Ok(Cursor::external(store.new_iterator()?)),
        })
    }

    /// Byte footprint of the partition
    pub fn size_bytes(&self) -> Result<u64> {
        self.with_backend(|backend| match backend {
            PartitionBackend::Embedded(engine) => Ok(engine.size_bytes()),
            PartitionBackend::Versioned(store) => Ok(store.size()),
        })
    }

    /// Apply one buffered batch atomically
    pub(crate) fn apply_batch(&self, batch: &PartitionBatch) -> Result<()> {
        self.with_backend(|backend| match (backend, batch) {
            (PartitionBackend::Embedded(engine), PartitionBatch::Embedded(b)) => {
                engine.write_batch(b)
            }
            (PartitionBackend::Versioned(store), PartitionBatch::Versioned(b)) => {
                store.write(b).map(|_| ())
            }
            (backend, batch) => Err(LedgerError::InvalidOperation(format!(
                "{} batch cannot be applied to {} partition {:?}",
                batch.kind(),
                backend.kind(),
                self.name
            ))),
        })
    }

    /// Release the backend (phase two of removal)
    ///
    /// Embedded partitions flush their memtable and sync the WAL first.
    /// A second call fails with `UseAfterClose`.
    pub fn destroy(&self) -> Result<()> {
        // The lock is held until the backend is gone, so `is_destroyed` never
        // reports true while the embedded engine still owns its directory
        let mut guard = self.backend.write();
        let backend = guard
            .take()
            .ok_or(LedgerError::UseAfterClose("partition"))?;

        let released = match backend {
            PartitionBackend::Embedded(engine) => engine.close(),
            PartitionBackend::Versioned(store) => store.release(),
        };
        drop(guard);
        released?;

        debug!(partition = %self.name, ordinal = self.ordinal, "partition destroyed");
        Ok(())
    }
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("backend", &self.kind)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

struct RegistryState {
    partitions: HashMap<String, Arc<Partition>>,
    /// Unregistered partitions whose backend may still be open
    draining: HashMap<String, Weak<Partition>>,
    next_ordinal: u32,
}

impl RegistryState {
    /// True while a dropped partition named `name` has not been released
    fn is_draining(&mut self, name: &str) -> bool {
        let live = self
            .draining
            .get(name)
            .and_then(Weak::upgrade)
            .is_some_and(|p| !p.is_destroyed());
        if !live {
            self.draining.remove(name);
        }
        live
    }
}

/// Name → partition mapping with ordinal assignment
///
/// Create and drop serialize on one mutex; the backend is opened while it is
/// held, so racing creates of one name produce one winner and one
/// `AlreadyExists`.
pub struct PartitionRegistry {
    config: Config,
    state: Mutex<RegistryState>,
}

impl PartitionRegistry {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState {
                partitions: HashMap::new(),
                draining: HashMap::new(),
                next_ordinal: DEFAULT_ORDINAL + 1,
            }),
        }
    }

    fn validate_name(name: &str) -> Result<()> {
        let bad = name.is_empty()
            || name.chars().all(|c| c == '.')
            || name.contains(['/', '\\', '\0']);
        if bad {
            return Err(LedgerError::InvalidPartitionName(name.to_string()));
        }
        Ok(())
    }

    /// Create and register a partition
    pub fn create_partition(&self, name: &str) -> Result<Arc<Partition>> {
        Self::validate_name(name)?;
        if name == DEFAULT_PARTITION {
            return Err(LedgerError::AlreadyExists(name.to_string()));
        }

        let mut state = self.state.lock();
        if state.partitions.contains_key(name) || state.is_draining(name) {
            return Err(LedgerError::AlreadyExists(name.to_string()));
        }

        let ordinal = state.next_ordinal;
        let partition = Arc::new(Partition::open(&self.config, name, ordinal)?);

        // Only a successful open consumes the ordinal
        state.next_ordinal += 1;
        state
            .partitions
            .insert(name.to_string(), Arc::clone(&partition));

        debug!(partition = name, ordinal, backend = %partition.backend_kind(), "partition created");
        Ok(partition)
    }

    /// Unregister `partition` (phase one of removal) and hand it back
    ///
    /// The backend stays open until [`Partition::destroy`] is called, and
    /// creating the same name fails with `AlreadyExists` until then.
    pub fn drop_partition(&self, partition: &Partition) -> Result<Arc<Partition>> {
        let mut state = self.state.lock();

        let registered = state
            .partitions
            .get(partition.name())
            .is_some_and(|p| p.ordinal() == partition.ordinal());
        if !registered {
            return Err(LedgerError::UnknownPartition(partition.name().to_string()));
        }

        let removed = state
            .partitions
            .remove(partition.name())
            .ok_or_else(|| LedgerError::UnknownPartition(partition.name().to_string()))?;
        state
            .draining
            .insert(removed.name().to_string(), Arc::downgrade(&removed));

        debug!(partition = %removed.name(), ordinal = removed.ordinal(), "partition unregistered");
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Partition>> {
        self.state.lock().partitions.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().partitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.state.lock().partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().partitions.is_empty()
    }

    /// Ordinal the next created partition will receive
    pub fn next_ordinal(&self) -> u32 {
        self.state.lock().next_ordinal
    }

    /// Unregister every partition, returning them for destruction
    pub(crate) fn drain(&self) -> Vec<Arc<Partition>> {
        self.state
            .lock()
            .partitions
            .drain()
            .map(|(_, p)| p)
            .collect()
    }
}
