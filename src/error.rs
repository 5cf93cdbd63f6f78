//! Error types for ledgerkv
//!
//! Provides a unified error type for both storage backends and the
//! partition/batch/cursor layer on top of them.

use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for ledgerkv operations
#[derive(Debug, Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("Backend I/O error: {0}")]
    BackendIo(String),

    #[error("Key not found")]
    NotFound,

    #[error("Value of {size} bytes exceeds the limit of {limit} bytes")]
    ValueTooLarge { size: usize, limit: usize },

    // -------------------------------------------------------------------------
    // Partition Errors
    // -------------------------------------------------------------------------
    #[error("Partition {0:?} already exists")]
    AlreadyExists(String),

    #[error("Partition {0:?} is not registered")]
    UnknownPartition(String),

    #[error("Invalid partition name {0:?}")]
    InvalidPartitionName(String),

    // -------------------------------------------------------------------------
    // Contract Errors
    // -------------------------------------------------------------------------
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("{0} used after it was closed")]
    UseAfterClose(&'static str),

    #[error("Batch commit failed for {failed:?} (committed: {committed:?})")]
    PartialCommit {
        /// Partitions whose buffered batch is durable
        committed: Vec<String>,
        /// Partitions whose buffered batch was not applied, with the reason
        failed: Vec<(String, String)>,
    },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
