//! ByteView
//!
//! Read-only view over bytes returned by every read path, tagged with the
//! backend that produced it.
//!
//! - Views from the versioned backend always own their bytes (the store hands
//!   out copies).
//! - Views from an embedded cursor borrow the cursor's snapshot; the borrow
//!   ends at the next positioning call on that cursor.
//! - Embedded point reads return owned views.
//!
//! A missing key is `None`, never an empty view.

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use crate::config::BackendKind;

/// Read-only, possibly zero-copy view over a byte range
///
/// Deliberately not `Clone`: use [`ByteView::to_vec`] or
/// [`ByteView::into_owned`] for an explicit deep copy.
pub struct ByteView<'a> {
    data: Cow<'a, [u8]>,
    backend: BackendKind,
}

impl<'a> ByteView<'a> {
    /// Zero-copy view into embedded cursor memory
    pub(crate) fn embedded_borrowed(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            backend: BackendKind::Embedded,
        }
    }

    /// Bytes read from the embedded engine by a point lookup
    pub(crate) fn embedded_owned(data: Vec<u8>) -> ByteView<'static> {
        ByteView {
            data: Cow::Owned(data),
            backend: BackendKind::Embedded,
        }
    }

    /// Copy returned by the versioned store
    pub(crate) fn external(data: Vec<u8>) -> ByteView<'static> {
        ByteView {
            data: Cow::Owned(data),
            backend: BackendKind::Versioned,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether releasing this view frees its buffer
    pub fn is_owned(&self) -> bool {
        matches!(self.data, Cow::Owned(_))
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Deep copy of the bytes
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Detach from the cursor: copies borrowed bytes, moves owned ones
    pub fn into_owned(self) -> ByteView<'static> {
        ByteView {
            data: Cow::Owned(self.data.into_owned()),
            backend: self.backend,
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.into_owned()
    }
}

impl Deref for ByteView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for ByteView<'_> {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialEq<[u8]> for ByteView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.data.as_ref() == other
    }
}

impl PartialEq<&[u8]> for ByteView<'_> {
    fn eq(&self, other: &&[u8]) -> bool {
        self.data.as_ref() == *other
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for ByteView<'_> {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.data.as_ref() == other.as_slice()
    }
}

impl fmt::Debug for ByteView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("backend", &self.backend)
            .field("owned", &self.is_owned())
            .field("data", &String::from_utf8_lossy(&self.data))
            .finish()
    }
}
