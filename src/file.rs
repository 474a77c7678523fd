//! The file façade: one path string in, owned bytes out.
//!
//! [`File`] performs the whole resolution at construction — walking the
//! path, building or reusing container mappers, mapping or decoding the
//! terminal entry — and then exclusively owns the resulting [`MemoryView`].
//! Every accessor afterwards is pure.
//!
//! Each constructor has a lenient sibling (`*_or_empty`) that never fails:
//! a file that could not resolve exposes a valid zero-length view, and
//! [`File::error`] reports why. This keeps call sites that only care about
//! "got bytes or not" free of error plumbing, while the `Result` forms
//! serve callers that propagate.

use std::fmt;
use std::ops::Deref;

use crate::error::{Error, Result};
use crate::memory::MemoryView;
use crate::path;
use crate::resolver::Dir;

/// A resolved file: name, location, and exclusively-owned bytes.
///
/// The view (and through it, whatever backs it: an OS mapping or a parent
/// archive's buffer) is released when the `File` is dropped.
pub struct File {
    filename: String,
    pathname: String,
    memory: MemoryView,
    error: Option<Error>,
}

impl File {
    /// Open a file by OS-rooted path string.
    ///
    /// The string splits at its last separator into location and leaf; the
    /// location may reach through any number of nested containers.
    pub fn open(pathstr: &str) -> Result<File> {
        let (prefix, leaf) = path::split_leaf(pathstr);
        let dir = Dir::open(prefix)?;
        Self::resolve_in(&dir, leaf)
    }

    /// Open a file relative to an already-resolved location.
    pub fn open_in(dir: &Dir, rel: &str) -> Result<File> {
        let (prefix, leaf) = path::split_leaf(rel);
        let sub = Dir::open_in(dir, prefix)?;
        Self::resolve_in(&sub, leaf)
    }

    /// Open a file inside an in-memory container of the given format.
    ///
    /// `filename` may itself contain separators addressing containers
    /// nested deeper inside the blob.
    pub fn from_memory(view: MemoryView, extension: &str, filename: &str) -> Result<File> {
        let root = Dir::from_memory(view, extension)?;
        Self::open_in(&root, filename)
    }

    /// Like [`File::open`], but a failed resolution yields a zero-length
    /// file carrying the error instead of failing.
    pub fn open_or_empty(pathstr: &str) -> File {
        Self::open(pathstr).unwrap_or_else(|e| {
            let (prefix, leaf) = path::split_leaf(pathstr);
            let root = if path::is_absolute(prefix) { "/" } else { "" };
            Self::failed(path::join_dir(root, prefix), leaf, e)
        })
    }

    /// Like [`File::open_in`], but never fails; see [`File::open_or_empty`].
    pub fn open_in_or_empty(dir: &Dir, rel: &str) -> File {
        Self::open_in(dir, rel).unwrap_or_else(|e| {
            let (prefix, leaf) = path::split_leaf(rel);
            Self::failed(path::join_dir(dir.pathname(), prefix), leaf, e)
        })
    }

    /// Like [`File::from_memory`], but never fails; see
    /// [`File::open_or_empty`].
    pub fn from_memory_or_empty(view: MemoryView, extension: &str, filename: &str) -> File {
        Self::from_memory(view, extension, filename).unwrap_or_else(|e| {
            let (prefix, leaf) = path::split_leaf(filename);
            Self::failed(path::join_dir("<memory>/", prefix), leaf, e)
        })
    }

    fn resolve_in(dir: &Dir, leaf: &str) -> Result<File> {
        let memory = dir.resolve(leaf)?;
        Ok(File {
            filename: leaf.to_string(),
            pathname: dir.pathname().to_string(),
            memory,
            error: None,
        })
    }

    fn failed(pathname: String, leaf: &str, error: Error) -> File {
        File {
            filename: leaf.to_string(),
            pathname,
            memory: MemoryView::empty(),
            error: Some(error),
        }
    }

    /// The leaf name this file was resolved as.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The textual location the file was resolved in.
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// The file's bytes.
    pub fn data(&self) -> &[u8] {
        self.memory.as_slice()
    }

    /// The file's size in bytes.
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// Whether the file has zero size (including the failed-resolution
    /// case of the `*_or_empty` constructors).
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// The owned memory view.
    pub fn view(&self) -> &MemoryView {
        &self.memory
    }

    /// Why resolution failed, for files built by an `*_or_empty`
    /// constructor. `None` for successfully resolved files.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

impl Deref for File {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data()
    }
}

impl AsRef<[u8]> for File {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}

impl From<File> for MemoryView {
    /// Release the file wrapper, keeping its view (and the view's backing)
    /// alive.
    fn from(file: File) -> MemoryView {
        file.memory
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("pathname", &self.pathname)
            .field("filename", &self.filename)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::pak::build_pak;
    use crate::registry;
    use std::fs;
    use tempfile::TempDir;

    fn write_fixtures() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/f.bin"), b"on disk").unwrap();
        let image = build_pak(&[("x.bin", b"in pak", 0), ("b/c.bin", b"deep entry", 0)]);
        fs::write(dir.path().join("a.pak"), image).unwrap();
        dir
    }

    #[test]
    fn test_open_matches_file_contents() {
        let dir = write_fixtures();
        let path = dir.path().join("sub/f.bin");
        let file = File::open(&path.display().to_string()).unwrap();
        assert_eq!(file.size() as u64, fs::metadata(&path).unwrap().len());
        assert_eq!(file.data(), fs::read(&path).unwrap().as_slice());
        assert_eq!(file.filename(), "f.bin");
    }

    #[test]
    fn test_separator_equivalence() {
        let dir = write_fixtures();
        let root = dir.path().display().to_string();
        let slash = File::open(&format!("{root}/sub/f.bin")).unwrap();
        let back = File::open(&format!("{root}/sub\\f.bin")).unwrap();
        let colon = File::open(&format!("{root}/sub:f.bin")).unwrap();
        assert_eq!(slash.data(), back.data());
        assert_eq!(slash.data(), colon.data());
    }

    #[test]
    fn test_open_through_archive() {
        let dir = write_fixtures();
        let root = dir.path().display().to_string();
        let file = File::open(&format!("{root}/a.pak/x.bin")).unwrap();
        assert_eq!(file.data(), b"in pak");
        let deep = File::open(&format!("{root}/a.pak:b:c.bin")).unwrap();
        assert_eq!(deep.data(), b"deep entry");
    }

    #[test]
    fn test_missing_leaf_is_not_found() {
        let dir = write_fixtures();
        let root = dir.path().display().to_string();
        let err = File::open(&format!("{root}/sub/absent.bin")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_or_empty_reports_and_zeroes() {
        let dir = write_fixtures();
        let root = dir.path().display().to_string();
        let file = File::open_or_empty(&format!("{root}/sub/absent.bin"));
        assert_eq!(file.size(), 0);
        assert!(file.is_empty());
        assert_eq!(file.filename(), "absent.bin");
        assert!(file.error().is_some_and(Error::is_not_found));
    }

    #[test]
    fn test_nested_resolution_is_associative() {
        let dir = write_fixtures();
        let root = Dir::open(&dir.path().display().to_string()).unwrap();

        let direct = File::open_in(&root, "a.pak/b/c.bin").unwrap();
        let archive = Dir::open_in(&root, "a.pak").unwrap();
        let stepped = File::open_in(&archive, "b/c.bin").unwrap();

        // Same bytes — and same address: both come from the one cached
        // mapper's zero-copy slice of the mapped archive.
        assert_eq!(direct.data(), stepped.data());
        assert_eq!(direct.view(), stepped.view());
    }

    #[test]
    fn test_from_memory_end_to_end() {
        registry::register("testfmt", crate::mapper::PakMapper::factory).unwrap();
        let image = build_pak(&[("x.bin", b"\xde\xad\xbe\xef", 0)]);
        let file =
            File::from_memory(MemoryView::from_vec(image), "testfmt", "x.bin").unwrap();
        assert_eq!(file.data(), b"\xde\xad\xbe\xef");
        assert_eq!(file.size(), 4);
    }

    #[test]
    fn test_from_memory_nested_is_zero_copy() {
        let inner = build_pak(&[("c.bin", b"bottom", 0)]);
        let outer = build_pak(&[("inner.pak", &inner, 0)]);
        let total = outer.len();
        let view = MemoryView::from_vec(outer);
        let base = view.as_slice().as_ptr() as usize;

        let file = File::from_memory(view, "pak", "inner.pak/c.bin").unwrap();
        assert_eq!(file.data(), b"bottom");
        let addr = file.data().as_ptr() as usize;
        assert!(addr >= base && addr + file.size() <= base + total);
    }

    #[test]
    fn test_corrupt_container_in_path_surfaces() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.pak"), b"XXXX definitely not a pak").unwrap();
        let root = dir.path().display().to_string();
        let err = File::open(&format!("{root}/bad.pak/x.bin")).unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }

    #[test]
    fn test_into_view_keeps_bytes_alive() {
        let dir = write_fixtures();
        let root = dir.path().display().to_string();
        let file = File::open(&format!("{root}/a.pak/x.bin")).unwrap();
        let view: MemoryView = file.into();
        assert_eq!(view.as_slice(), b"in pak");
    }
}
