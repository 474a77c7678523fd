//! Error types for path resolution and container access.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout nestfs.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the resolution layer can produce.
///
/// `EntryNotFound` is a normal, expected outcome; callers that want to avoid
/// error-driven control flow can probe with [`Mapper::exists`] first. The
/// structural variants (`Corrupt`, `DuplicateMapper`) are unrecoverable for
/// the affected container or registration and surface immediately. No
/// operation in this layer retries: resolution is local and deterministic,
/// so a failure repeats identically.
///
/// [`Mapper::exists`]: crate::Mapper::exists
#[derive(Debug, Error)]
pub enum Error {
    /// No file or archive entry with this name at the current level.
    ///
    /// Missing OS files and permission-denied OS files both map here; the
    /// distinction is not useful to a read-only consumer.
    #[error("entry not found: '{0}'")]
    EntryNotFound(String),

    /// A container's header or index failed structural validation.
    #[error("corrupt container: {0}")]
    Corrupt(&'static str),

    /// The container format is recognized but the entry uses a sub-feature
    /// this build does not implement (e.g. an unknown compression method).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A different factory is already registered for this extension.
    #[error("a different mapper is already registered for extension '{0}'")]
    DuplicateMapper(String),

    /// A requested sub-range falls outside its memory view.
    #[error("range {offset}+{len} out of bounds for {size}-byte view")]
    InvalidRange {
        /// Requested start offset within the view.
        offset: usize,
        /// Requested length.
        len: usize,
        /// Size of the view the range was requested from.
        size: usize,
    },

    /// An OS operation failed for a reason other than the entry being
    /// missing or inaccessible (those map to [`Error::EntryNotFound`]).
    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        /// Path the operation was performed on.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },
}

impl Error {
    /// Wrap an OS error with the path it occurred on.
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error is the expected miss case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_))
    }
}
