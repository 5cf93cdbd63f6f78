//! Cursor
//!
//! One ordered-iteration handle over either backend.
//!
//! ```text
//!            seek / seek_to_* / next / prev
//!   Open ──────────────▶ Positioned ◀──────┐
//!     │                      │  next/prev  │
//!     │                      ▼             │
//!     │                  Past-End ─────────┘ (seek*)
//!     │ close                │ close
//!     └────────────▶ Closed ◀┘
//! ```
//!
//! Validity comes from the backend state and must be re-checked after every
//! positioning call. Views returned by `key()`/`value()` borrow the cursor, so
//! the borrow checker ends them before the next positioning call.

use bytes::Bytes;
use tracing::debug;

use crate::config::BackendKind;
use crate::error::{LedgerError, Result};
use crate::versioned::VersionedIterator;
use crate::view::ByteView;

/// Cursor over an embedded partition
///
/// Owns a merged snapshot taken when the cursor was opened; views borrow it.
pub(crate) struct EmbeddedCursor {
    entries: Vec<(Bytes, Bytes)>,
    position: Option<usize>,
    /// First error met while building the snapshot
    status: Option<String>,
}

impl EmbeddedCursor {
    pub(crate) fn new(entries: Vec<(Bytes, Bytes)>) -> Self {
        Self {
            entries,
            position: None,
            status: None,
        }
    }

    /// A cursor whose snapshot could not be read; never valid
    pub(crate) fn failed(error: LedgerError) -> Self {
        Self {
            entries: Vec::new(),
            position: None,
            status: Some(error.to_string()),
        }
    }

    fn valid(&self) -> bool {
        self.position.is_some()
    }

    fn key(&self) -> Option<&[u8]> {
        self.position.map(|p| self.entries[p].0.as_ref())
    }

    fn value(&self) -> Option<&[u8]> {
        self.position.map(|p| self.entries[p].1.as_ref())
    }

    fn step(&mut self, forward: bool) -> Result<()> {
        let pos = self.position.ok_or_else(|| {
            LedgerError::InvalidOperation("cannot step a cursor that is not valid".to_string())
        })?;
        self.position = if forward {
            Some(pos + 1).filter(|&p| p < self.entries.len())
        } else {
            pos.checked_sub(1)
        };
        Ok(())
    }

    fn seek_to_first(&mut self) {
        self.position = if self.entries.is_empty() { None } else { Some(0) };
    }

    fn seek_to_last(&mut self) {
        self.position = self.entries.len().checked_sub(1);
    }

    fn seek(&mut self, target: &[u8]) {
        let idx = self
            .entries
            .partition_point(|(k, _)| k.as_ref() < target);
        self.position = Some(idx).filter(|&i| i < self.entries.len());
    }
}

enum CursorState {
    Embedded(EmbeddedCursor),
    External(VersionedIterator),
    Closed,
}

/// Ordered iterator over one partition, whichever backend it lives in
pub struct Cursor {
    state: CursorState,
}

impl Cursor {
    pub(crate) fn embedded(cursor: EmbeddedCursor) -> Self {
        Self {
            state: CursorState::Embedded(cursor),
        }
    }

    pub(crate) fn external(iterator: VersionedIterator) -> Self {
        Self {
            state: CursorState::External(iterator),
        }
    }

    /// Backend this cursor iterates, `None` once closed
    pub fn backend(&self) -> Option<BackendKind> {
        match self.state {
            CursorState::Embedded(_) => Some(BackendKind::Embedded),
            CursorState::External(_) => Some(BackendKind::Versioned),
            CursorState::Closed => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed)
    }

    /// True iff positioned on an existing key
    pub fn valid(&self) -> bool {
        match &self.state {
            CursorState::Embedded(c) => c.valid(),
            CursorState::External(it) => it.valid(),
            CursorState::Closed => false,
        }
    }

    /// Valid and the current key starts with `prefix` (embedded backend only)
    pub fn valid_for_prefix(&self, prefix: &[u8]) -> Result<bool> {
        match &self.state {
            CursorState::Embedded(c) => Ok(c.key().is_some_and(|k| k.starts_with(prefix))),
            CursorState::External(_) => Err(LedgerError::InvalidOperation(
                "valid_for_prefix is not supported by the versioned backend".to_string(),
            )),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    /// Current key, or `None` when not positioned
    pub fn key(&self) -> Result<Option<ByteView<'_>>> {
        match &self.state {
            CursorState::Embedded(c) => Ok(c.key().map(ByteView::embedded_borrowed)),
            CursorState::External(it) if it.valid() => Ok(Some(ByteView::external(it.key()?))),
            CursorState::External(_) => Ok(None),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    /// Current value, or `None` when not positioned
    pub fn value(&self) -> Result<Option<ByteView<'_>>> {
        match &self.state {
            CursorState::Embedded(c) => Ok(c.value().map(ByteView::embedded_borrowed)),
            CursorState::External(it) if it.valid() => {
                Ok(Some(ByteView::external(it.value()?)))
            }
            CursorState::External(_) => Ok(None),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    /// Step forward; fails if the cursor is not valid
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<()> {
        match &mut self.state {
            CursorState::Embedded(c) => c.step(true),
            CursorState::External(it) => it.next(),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    /// Step backward; fails if the cursor is not valid
    pub fn prev(&mut self) -> Result<()> {
        match &mut self.state {
            CursorState::Embedded(c) => c.step(false),
            CursorState::External(it) => it.prev(),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    pub fn seek_to_first(&mut self) -> Result<()> {
        match &mut self.state {
            CursorState::Embedded(c) => {
                c.seek_to_first();
                Ok(())
            }
            CursorState::External(it) => it.seek_to_first(),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    pub fn seek_to_last(&mut self) -> Result<()> {
        match &mut self.state {
            CursorState::Embedded(c) => {
                c.seek_to_last();
                Ok(())
            }
            CursorState::External(it) => it.seek_to_last(),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    /// Position at the first key ≥ `target`
    ///
    /// Embedded: byte-lexicographic. Versioned: the store's own key order.
    pub fn seek(&mut self, target: &[u8]) -> Result<()> {
        match &mut self.state {
            CursorState::Embedded(c) => {
                c.seek(target);
                Ok(())
            }
            CursorState::External(it) => it.seek(target),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    /// Error accumulated while iterating (embedded backend only)
    pub fn error(&self) -> Result<Option<LedgerError>> {
        match &self.state {
            CursorState::Embedded(c) => Ok(c.status.clone().map(LedgerError::BackendIo)),
            CursorState::External(_) => Err(LedgerError::InvalidOperation(
                "error() is not supported by the versioned backend; its calls fail directly"
                    .to_string(),
            )),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }

    /// Release backend resources; a second call fails with `UseAfterClose`
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, CursorState::Closed) {
            CursorState::Embedded(_) => Ok(()),
            CursorState::External(mut it) => it.release(),
            CursorState::Closed => Err(LedgerError::UseAfterClose("cursor")),
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if !self.is_closed() {
            debug!(backend = ?self.backend(), "cursor dropped without close");
        }
    }
}
