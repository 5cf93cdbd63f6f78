//! Storage Module
//!
//! Persistent storage layer of the embedded engine, using immutable SSTables.
//!
//! ## Responsibilities
//! - Persist flushed memtables to disk in sorted format
//! - Point lookups newest → oldest with range filtering
//! - Merged scans for cursor snapshots
//! - Report the on-disk footprint of a partition
//!
//! The file layout is documented in [`sstable`].

pub mod sstable;
mod manager;

pub use sstable::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader};
pub use manager::{MergedEntries, StorageManager};
