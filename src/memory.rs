//! Read-only memory views over heterogeneous backings.
//!
//! A [`MemoryView`] is the unit of data exchange at every boundary of the
//! crate: the same type carries an OS file mapping handed out by a directory,
//! a zero-copy sub-range of an archive's bytes, and a window into a buffer
//! that an archive mapper decoded on demand.
//!
//! ```text
//! MemoryView { backing, offset, len }
//! └── backing
//!     ├── Empty                  // zero-size, no allocation
//!     ├── Mmap(Arc<Mmap>)        // OS mapping, unmapped on last drop
//!     └── Owned(Arc<[u8]>)       // resident buffer (decoded archive payload)
//! ```
//!
//! Clones and slices are cheap: they bump the backing's reference count and
//! adjust the window. The release obligation — unmap the region, or free the
//! decoded buffer — runs exactly once, when the last view into a backing is
//! dropped. A view sliced out of an archive therefore keeps the archive's
//! bytes alive for as long as the view itself exists.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use memmap2::Mmap;

use crate::error::{Error, Result};

#[derive(Clone)]
enum Backing {
    Empty,
    Mmap(Arc<Mmap>),
    Owned(Arc<[u8]>),
}

/// A read-only byte window with a well-defined release obligation.
///
/// Equality is identity of the (address, size) pair, not content: two views
/// are equal when they expose the same bytes *in memory*, which is what the
/// zero-copy contract cares about.
#[derive(Clone)]
pub struct MemoryView {
    backing: Backing,
    offset: usize,
    len: usize,
}

impl MemoryView {
    /// A valid view of zero bytes.
    pub fn empty() -> Self {
        Self {
            backing: Backing::Empty,
            offset: 0,
            len: 0,
        }
    }

    /// Wrap a read-only OS mapping.
    ///
    /// The mapping is unmapped when the last view into it is dropped.
    pub fn from_mmap(mmap: Mmap) -> Self {
        let len = mmap.len();
        Self {
            backing: Backing::Mmap(Arc::new(mmap)),
            offset: 0,
            len,
        }
    }

    /// Wrap a shared resident buffer.
    pub fn from_arc(bytes: Arc<[u8]>) -> Self {
        let len = bytes.len();
        Self {
            backing: Backing::Owned(bytes),
            offset: 0,
            len,
        }
    }

    /// Wrap owned bytes.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self::from_arc(Arc::from(bytes))
    }

    /// The bytes of this view.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::Empty => &[],
            Backing::Mmap(mmap) => &mmap[self.offset..self.offset + self.len],
            Backing::Owned(bytes) => &bytes[self.offset..self.offset + self.len],
        }
    }

    /// Size of the view in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view has zero size.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A sub-window of this view sharing the same backing.
    ///
    /// Fails with [`Error::InvalidRange`] if the range falls outside the
    /// view. This is a defensive check, not a normal runtime path: container
    /// indexes are bounds-validated at construction.
    pub fn slice(&self, offset: usize, len: usize) -> Result<MemoryView> {
        let end = offset.checked_add(len).filter(|&end| end <= self.len);
        match end {
            Some(_) => Ok(Self {
                backing: self.backing.clone(),
                offset: self.offset + offset,
                len,
            }),
            None => Err(Error::InvalidRange {
                offset,
                len,
                size: self.len,
            }),
        }
    }
}

impl Deref for MemoryView {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for MemoryView {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for MemoryView {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.as_slice().as_ptr() == other.as_slice().as_ptr()
    }
}

impl Eq for MemoryView {}

impl fmt::Debug for MemoryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryView")
            .field("address", &self.as_slice().as_ptr())
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_view() {
        let view = MemoryView::empty();
        assert_eq!(view.len(), 0);
        assert!(view.is_empty());
        assert_eq!(view.as_slice(), &[] as &[u8]);
    }

    #[test]
    fn test_owned_bytes() {
        let view = MemoryView::from_vec(vec![1, 2, 3, 4]);
        assert_eq!(view.len(), 4);
        assert_eq!(view.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(&view[1..3], &[2, 3]);
    }

    #[test]
    fn test_slice_shares_backing() {
        let view = MemoryView::from_vec(vec![10, 20, 30, 40, 50]);
        let sub = view.slice(1, 3).unwrap();
        assert_eq!(sub.as_slice(), &[20, 30, 40]);

        // The slice points into the parent's bytes, not a copy.
        let base = view.as_slice().as_ptr() as usize;
        assert_eq!(sub.as_slice().as_ptr() as usize, base + 1);

        // Dropping the parent leaves the backing alive.
        drop(view);
        assert_eq!(sub.as_slice(), &[20, 30, 40]);
    }

    #[test]
    fn test_slice_of_slice() {
        let view = MemoryView::from_vec(vec![0, 1, 2, 3, 4, 5]);
        let sub = view.slice(2, 4).unwrap().slice(1, 2).unwrap();
        assert_eq!(sub.as_slice(), &[3, 4]);
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let view = MemoryView::from_vec(vec![0; 8]);
        assert!(matches!(
            view.slice(4, 8),
            Err(Error::InvalidRange {
                offset: 4,
                len: 8,
                size: 8
            })
        ));
        // Offset + len overflow must not wrap around.
        assert!(view.slice(usize::MAX, 2).is_err());
        // Zero-length slices are valid anywhere inside the view.
        assert!(view.slice(8, 0).is_ok());
    }

    #[test]
    fn test_equality_is_identity() {
        let a = MemoryView::from_vec(vec![1, 2, 3]);
        let b = MemoryView::from_vec(vec![1, 2, 3]);
        // Same content, different address: not equal.
        assert_ne!(a, b);
        // A full-range slice exposes the same bytes in memory: equal.
        assert_eq!(a, a.slice(0, 3).unwrap());
        assert_eq!(a, a.clone());
    }
}
