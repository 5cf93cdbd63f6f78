//! Write-Ahead Log (WAL) Module
//!
//! Durability for the embedded engine through append-only logging.
//!
//! ## Responsibilities
//! - Append log entries before any memtable mutation
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay
//! - Batches logged as a single entry so they replay all-or-nothing
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Entry 1                                              │
//! │ ┌─────────┬─────────┬─────────┬────────────────────┐ │
//! │ │ LSN (8) │ CRC (4) │ Len (4) │ bincode(ts, op)    │ │
//! │ └─────────┴─────────┴─────────┴────────────────────┘ │
//! ├──────────────────────────────────────────────────────┤
//! │ Entry 2 ...                                          │
//! └──────────────────────────────────────────────────────┘
//! ```
//! The CRC covers the LSN and the payload.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE};
pub use writer::WalWriter;
pub use reader::{WalReader, WalIterator};
pub use recovery::{WalRecovery, RecoveryResult};
