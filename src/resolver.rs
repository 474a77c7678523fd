//! Path resolution through nested containers.
//!
//! A [`Dir`] is a resolved location: the terminal [`Mapper`] reached by
//! walking a path string, plus the residual sub-path inside it. Walking
//! consumes the path segment by segment; whenever an accumulated candidate
//! names an existing entry whose extension is registered as a container
//! format, the entry's bytes are materialized and the matching factory
//! builds a nested mapper to continue inside.
//!
//! ```text
//! "assets/world.pak/maps/e1.pak/level.bin"
//!  └─────┬─────────┘ └────┬───────┘
//!        │                │
//!  DirectoryMapper → PakMapper("world.pak") → PakMapper("maps/e1.pak")
//!                                             └── resolve("level.bin")
//! ```
//!
//! Nested mappers built under a `Dir` are cached and shared with every `Dir`
//! and [`File`](crate::File) derived from it, so resolving the same prefix
//! twice re-parses nothing. The chain needs no parent pointers: each nested
//! mapper keeps the memory view of its own container file, which pins the
//! parent's backing until the mapper itself is dropped — teardown runs
//! leaf-last by reference counting alone.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::mapper::{DirectoryMapper, Mapper};
use crate::memory::MemoryView;
use crate::path;
use crate::registry;

type MapperCache = RwLock<FxHashMap<String, Arc<dyn Mapper>>>;

/// A resolved location: an OS directory, or a position inside (possibly
/// nested) archive containers.
///
/// Cheap to clone and safe to share across threads. Opening files or child
/// locations relative to a `Dir` reuses every container mapper the `Dir`'s
/// lineage has already built.
#[derive(Clone)]
pub struct Dir {
    mapper: Arc<dyn Mapper>,
    /// OS root when the terminal mapper is a directory mapper.
    os_root: Option<PathBuf>,
    /// Residual sub-path inside the terminal mapper ("" or `a/b`).
    base: String,
    /// Textual path of this location ("" or ending in `/`).
    pathname: String,
    /// Container mappers built under this lineage, keyed by walked path.
    cache: Arc<MapperCache>,
    /// Cache-key prefix for candidates walked from this location.
    cache_prefix: String,
}

impl Dir {
    /// Resolve a path string rooted at the OS filesystem.
    ///
    /// The string may reach through archive containers: every segment whose
    /// extension names a registered format and which exists at its level
    /// becomes a container boundary. An empty string is the process's
    /// current directory.
    pub fn open(pathstr: &str) -> Result<Dir> {
        let absolute = path::is_absolute(pathstr);
        let pathname = path::join_dir(if absolute { "/" } else { "" }, pathstr);
        let cache = Arc::new(RwLock::new(FxHashMap::default()));

        // Fast path: the whole prefix is a real OS directory.
        let native = path::to_native(pathstr);
        if !pathstr.is_empty() && native.is_dir() {
            return Ok(Dir {
                mapper: Arc::new(DirectoryMapper::new(native.clone())),
                os_root: Some(native),
                base: String::new(),
                pathname,
                cache,
                cache_prefix: String::new(),
            });
        }

        let root = PathBuf::from(if absolute { "/" } else { "." });
        let start: Arc<dyn Mapper> = Arc::new(DirectoryMapper::new(root.clone()));
        let walked = walk(start, "", pathstr, &cache, "")?;
        Ok(Self::from_walked(walked, Some(root), pathname, cache))
    }

    /// Resolve a path string as a continuation of an existing location.
    ///
    /// The new `Dir` shares `parent`'s mapper cache: addressing a file
    /// inside an archive inside a directory does not re-walk or re-parse
    /// the outer levels.
    pub fn open_in(parent: &Dir, rel: &str) -> Result<Dir> {
        let walked = walk(
            parent.mapper.clone(),
            &parent.base,
            rel,
            &parent.cache,
            &parent.cache_prefix,
        )?;
        let pathname = path::join_dir(&parent.pathname, rel);
        Ok(Self::from_walked(
            walked,
            parent.os_root.clone(),
            pathname,
            parent.cache.clone(),
        ))
    }

    /// Treat an in-memory blob as a container of the given format and make
    /// it the root of resolution. No OS interaction takes place.
    ///
    /// Fails with [`Error::Unsupported`] if no mapper is registered for
    /// `extension`, and propagates the factory's [`Error::Corrupt`] if the
    /// blob does not parse.
    pub fn from_memory(view: MemoryView, extension: &str) -> Result<Dir> {
        let factory = registry::lookup(extension).ok_or_else(|| {
            Error::Unsupported(format!("no mapper registered for extension '{extension}'"))
        })?;
        let mapper: Arc<dyn Mapper> = Arc::from(factory(view)?);
        Ok(Dir {
            mapper,
            os_root: None,
            base: String::new(),
            pathname: "<memory>/".to_string(),
            cache: Arc::new(RwLock::new(FxHashMap::default())),
            cache_prefix: String::new(),
        })
    }

    fn from_walked(
        walked: Walked,
        os_root: Option<PathBuf>,
        pathname: String,
        cache: Arc<MapperCache>,
    ) -> Dir {
        match (walked.promoted, os_root) {
            // Ended inside a container: keep the residual as `base`.
            (true, _) | (false, None) => Dir {
                mapper: walked.mapper,
                os_root: None,
                base: walked.base,
                pathname,
                cache,
                cache_prefix: walked.key_prefix,
            },
            // Never left the OS filesystem: re-root a directory mapper at
            // the accumulated sub-path so `base` stays empty.
            (false, Some(root)) => {
                let mut full = root;
                for seg in path::segments(&walked.base) {
                    full.push(seg);
                }
                Dir {
                    mapper: Arc::new(DirectoryMapper::new(full.clone())),
                    os_root: Some(full),
                    base: String::new(),
                    pathname,
                    cache,
                    cache_prefix: path::join(&walked.key_prefix, &walked.base),
                }
            }
        }
    }

    /// The textual path of this location (empty, or ending in `/`).
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// Whether `name` resolves to an entry at this location.
    pub fn exists(&self, name: &str) -> bool {
        self.mapper
            .exists(&path::join(&self.base, &path::normalize(name)))
    }

    /// Resolve `name` at this location to a read-only memory view.
    pub fn resolve(&self, name: &str) -> Result<MemoryView> {
        self.mapper
            .resolve(&path::join(&self.base, &path::normalize(name)))
    }

    /// Enumerate entry names at this location, in the underlying
    /// container's natural order.
    pub fn entries(&self) -> Box<dyn Iterator<Item = String> + '_> {
        if self.base.is_empty() {
            self.mapper.enumerate()
        } else {
            let prefix = format!("{}/", self.base);
            Box::new(self.mapper.enumerate().filter_map(move |name| {
                name.strip_prefix(prefix.as_str()).map(str::to_owned)
            }))
        }
    }
}

impl fmt::Debug for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dir")
            .field("pathname", &self.pathname)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

struct Walked {
    mapper: Arc<dyn Mapper>,
    /// Residual segments not consumed by a container boundary.
    base: String,
    key_prefix: String,
    promoted: bool,
}

/// Consume `rel` segment by segment from `start`, promoting registered
/// container entries into nested mappers as they are met.
fn walk(
    start: Arc<dyn Mapper>,
    base: &str,
    rel: &str,
    cache: &MapperCache,
    cache_prefix: &str,
) -> Result<Walked> {
    let mut mapper = start;
    let mut pending = base.to_string();
    let mut key_prefix = cache_prefix.to_string();
    let mut promoted = false;

    for seg in path::segments(rel) {
        let candidate = path::join(&pending, seg);
        let boundary = path::extension(seg)
            .and_then(registry::lookup)
            .filter(|_| mapper.exists(&candidate));
        match boundary {
            Some(factory) => {
                let key = path::join(&key_prefix, &candidate);
                let cached = cache.read().get(&key).cloned();
                let next = match cached {
                    Some(mapper) => mapper,
                    None => {
                        let bytes = mapper.resolve(&candidate)?;
                        let built: Arc<dyn Mapper> = Arc::from(factory(bytes)?);
                        cache.write().entry(key.clone()).or_insert(built).clone()
                    }
                };
                mapper = next;
                key_prefix = key;
                pending.clear();
                promoted = true;
            }
            // Not a container boundary: the segment stays part of the
            // literal sub-path, whether or not its extension is known.
            None => pending = candidate,
        }
    }

    Ok(Walked {
        mapper,
        base: pending,
        key_prefix,
        promoted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::pak::build_pak;
    use std::fs;
    use tempfile::TempDir;

    fn root_with_pak() -> TempDir {
        let dir = TempDir::new().unwrap();
        let image = build_pak(&[
            ("x.bin", b"xx-bytes", 0),
            ("sub/a.bin", b"aa", 0),
            ("sub/b.bin", b"bb", 0),
        ]);
        fs::write(dir.path().join("a.pak"), image).unwrap();
        dir
    }

    fn open_str(dir: &TempDir, rel: &str) -> String {
        format!("{}/{rel}", dir.path().display())
    }

    #[test]
    fn test_open_os_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f.bin"), b"plain").unwrap();
        let d = Dir::open(&dir.path().display().to_string()).unwrap();
        assert!(d.exists("f.bin"));
        assert_eq!(d.resolve("f.bin").unwrap().as_slice(), b"plain");
    }

    #[test]
    fn test_open_walks_into_archive() {
        let dir = root_with_pak();
        let d = Dir::open(&open_str(&dir, "a.pak")).unwrap();
        assert!(d.exists("x.bin"));
        assert!(!d.exists("missing.bin"));
        assert_eq!(d.resolve("x.bin").unwrap().as_slice(), b"xx-bytes");
    }

    #[test]
    fn test_open_in_shares_container_cache() {
        let dir = root_with_pak();
        let root = Dir::open(&dir.path().display().to_string()).unwrap();
        let first = Dir::open_in(&root, "a.pak").unwrap();
        let second = Dir::open_in(&root, "a.pak").unwrap();
        // The archive index was parsed once; both locations hold the same
        // mapper instance.
        assert!(Arc::ptr_eq(&first.mapper, &second.mapper));
        assert_eq!(root.cache.read().len(), 1);
    }

    #[test]
    fn test_residual_base_inside_archive() {
        let image = build_pak(&[
            ("sub/a.bin", b"aa", 0),
            ("sub/b.bin", b"bb", 0),
            ("top.bin", b"tt", 0),
        ]);
        let root = Dir::from_memory(MemoryView::from_vec(image), "pak").unwrap();
        let sub = Dir::open_in(&root, "sub").unwrap();
        assert!(sub.exists("a.bin"));
        assert_eq!(sub.resolve("b.bin").unwrap().as_slice(), b"bb");

        let mut names: Vec<_> = sub.entries().collect();
        names.sort();
        assert_eq!(names, ["a.bin", "b.bin"]);
    }

    #[test]
    fn test_open_in_plain_subdirectory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        fs::write(dir.path().join("x/y/f.bin"), b"deep").unwrap();
        let root = Dir::open(&dir.path().display().to_string()).unwrap();
        let sub = Dir::open_in(&root, "x\\y").unwrap();
        assert_eq!(sub.resolve("f.bin").unwrap().as_slice(), b"deep");
        let names: Vec<_> = sub.entries().collect();
        assert_eq!(names, ["f.bin"]);
    }

    #[test]
    fn test_from_memory_unknown_extension() {
        let err = Dir::from_memory(MemoryView::empty(), "mystery").unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_nested_archive_in_archive() {
        let inner = build_pak(&[("c.bin", b"innermost", 0)]);
        let outer = build_pak(&[("inner.pak", &inner, 0)]);
        let root = Dir::from_memory(MemoryView::from_vec(outer), "pak").unwrap();
        let nested = Dir::open_in(&root, "inner.pak").unwrap();
        assert_eq!(nested.resolve("c.bin").unwrap().as_slice(), b"innermost");
    }

    #[test]
    fn test_corrupt_nested_container_surfaces() {
        let outer = build_pak(&[("bad.pak", b"XXXX not a pak", 0)]);
        let root = Dir::from_memory(MemoryView::from_vec(outer), "pak").unwrap();
        assert!(matches!(
            Dir::open_in(&root, "bad.pak"),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn test_pathname_tracking() {
        let image = build_pak(&[("sub/a.bin", b"aa", 0)]);
        let root = Dir::from_memory(MemoryView::from_vec(image), "pak").unwrap();
        assert_eq!(root.pathname(), "<memory>/");
        let sub = Dir::open_in(&root, "sub").unwrap();
        assert_eq!(sub.pathname(), "<memory>/sub/");
    }
}
