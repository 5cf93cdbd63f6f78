//! # ledgerkv
//!
//! Storage layer for a permissioned-ledger consensus pipeline. One API over
//! two interchangeable backends:
//! - an embedded SSTable engine (WAL, MemTable, SSTables)
//! - a versioned store reached through managed object handles
//!
//! Both are organised into named partitions and support single-key reads
//! and writes, ordered cursors, and grouped batch commits.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StorageFacade                           │
//! │        (default partition + PartitionRegistry)               │
//! └──────────┬──────────────────┬───────────────────┬───────────┘
//!            │                  │                   │
//!            ▼                  ▼                   ▼
//!     ┌─────────────┐    ┌─────────────┐     ┌─────────────┐
//!     │  Partition  │    │   Cursor    │     │  BatchSet   │
//!     │  (get/put)  │    │ (ByteView)  │     │ (per-part.) │
//!     └──────┬──────┘    └──────┬──────┘     └──────┬──────┘
//!            └──────────────────┼───────────────────┘
//!                  ┌────────────┴────────────┐
//!                  ▼                         ▼
//!          ┌──────────────┐          ┌──────────────┐
//!          │   Embedded   │          │  Versioned   │
//!          │ WAL/MemTable │          │    Store     │
//!          │  /SSTables   │          │              │
//!          └──────────────┘          └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod memtable;
pub mod storage;
pub mod versioned;
pub mod wal;

pub mod batch;
pub mod cursor;
pub mod facade;
pub mod partition;
pub mod view;

pub mod timer;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use batch::BatchSet;
pub use config::{BackendKind, Config, WalSyncStrategy};
pub use cursor::Cursor;
pub use engine::{Engine, WriteBatch};
pub use error::{LedgerError, Result};
pub use facade::StorageFacade;
pub use partition::{Partition, PartitionRegistry, DEFAULT_PARTITION};
pub use timer::{PipelineTimers, RequestSampler, StageTimer};
pub use versioned::{VersionedBatch, VersionedStore};
pub use view::ByteView;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ledgerkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
