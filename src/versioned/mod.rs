//! Versioned Store Module
//!
//! The external backend: a version-tracked key-value store reached through
//! managed object handles.
//!
//! ## Model
//! - Every key keeps its full version history
//! - Each mutating call (put, delete, batch write) produces exactly one new
//!   store version
//! - Reads hand out copies; nothing borrows store memory
//! - Iterators are managed objects materialized at a version; they must be
//!   released (explicitly or on drop), and the store counts live ones
//! - Errors are raised synchronously by the call that hit them
//!
//! ```text
//!   key "a" ─▶ [v1: "1"] [v3: "10"] [v5: ⊘]
//!   key "b" ─▶ [v2: "2"]
//!   key "c" ─▶ [v4: "3"]                     latest_version = 5
//! ```

mod batch;
mod iterator;
mod store;

pub use batch::VersionedBatch;
pub use iterator::VersionedIterator;
pub use store::{Version, VersionedStore};
