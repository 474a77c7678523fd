//! OS directory mapper.

use std::fs;
use std::io;
use std::path::PathBuf;

use memmap2::Mmap;

use crate::error::{Error, Result};
use crate::memory::MemoryView;
use crate::path;

use super::Mapper;

/// Maps entry names to read-only OS file mappings under a root directory.
///
/// Entry names may span several segments (`sub/dir/file.bin`, any separator);
/// they are resolved under the root the mapper was built with. Directories
/// are not entries: resolving one reports [`Error::EntryNotFound`], the same
/// as a missing or inaccessible file.
pub struct DirectoryMapper {
    root: PathBuf,
}

impl DirectoryMapper {
    /// A mapper rooted at `root`. The directory is not required to exist
    /// yet; a missing root simply resolves nothing.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The OS directory this mapper resolves under.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        let mut p = self.root.clone();
        for seg in path::segments(name) {
            p.push(seg);
        }
        p
    }
}

impl Mapper for DirectoryMapper {
    fn exists(&self, name: &str) -> bool {
        !name.is_empty() && self.entry_path(name).is_file()
    }

    fn resolve(&self, name: &str) -> Result<MemoryView> {
        let path = self.entry_path(name);
        let not_found = || Error::EntryNotFound(path::normalize(name));

        let file = fs::File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => not_found(),
            _ => Error::io(&path, e),
        })?;
        let meta = file.metadata().map_err(|e| Error::io(&path, e))?;
        if meta.is_dir() {
            return Err(not_found());
        }
        if meta.len() == 0 {
            // Zero-length mappings are rejected by some platforms.
            return Ok(MemoryView::empty());
        }

        // SAFETY: the mapping is read-only over a regular file we hold open.
        // The view type keeps the mapping alive until its last clone drops,
        // so no access can outlive the mapping itself.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(&path, e))?;
        Ok(MemoryView::from_mmap(mmap))
    }

    fn enumerate(&self) -> Box<dyn Iterator<Item = String> + '_> {
        match fs::read_dir(&self.root) {
            Ok(entries) => Box::new(
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned()),
            ),
            Err(_) => Box::new(std::iter::empty()),
        }
    }
}
