//! Process-wide container-format registry.
//!
//! Maps a filename extension (case-insensitive) to a factory that builds an
//! archive mapper from the container's bytes. The table is seeded with the
//! built-in formats when first touched and extended with [`register`] during
//! application startup; after that it is read-only and safe for concurrent
//! lookups from any thread.
//!
//! ```ignore
//! use nestfs::{register, MemoryView, Mapper, Result};
//!
//! fn wad_factory(view: MemoryView) -> Result<Box<dyn Mapper>> {
//!     Ok(Box::new(WadMapper::new(view)?))
//! }
//!
//! register("wad", wad_factory)?;
//! ```

use std::sync::LazyLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::mapper::{Mapper, PakMapper};
use crate::memory::MemoryView;

/// Builds an archive mapper over a container's bytes.
pub type MapperFactory = fn(MemoryView) -> Result<Box<dyn Mapper>>;

static REGISTRY: LazyLock<RwLock<FxHashMap<String, MapperFactory>>> = LazyLock::new(|| {
    let mut table = FxHashMap::default();
    table.insert("pak".to_string(), PakMapper::factory as MapperFactory);
    RwLock::new(table)
});

fn canonical(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

/// Register a container format under a filename extension.
///
/// Registering the identical factory for the same extension again is a
/// no-op; a different factory fails with [`Error::DuplicateMapper`] — no two
/// formats may claim one extension. Call during startup, before resolution
/// begins; registration order across formats does not matter.
pub fn register(extension: &str, factory: MapperFactory) -> Result<()> {
    let key = canonical(extension);
    let mut table = REGISTRY.write();
    match table.get(&key) {
        Some(existing) if std::ptr::fn_addr_eq(*existing, factory) => Ok(()),
        Some(_) => Err(Error::DuplicateMapper(key)),
        None => {
            table.insert(key, factory);
            Ok(())
        }
    }
}

/// Look up the factory registered for an extension, if any.
///
/// `None` means the extension is not a container boundary: the resolver
/// treats such a segment as an ordinary file name.
pub fn lookup(extension: &str) -> Option<MapperFactory> {
    REGISTRY.read().get(&canonical(extension)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory_a(_view: MemoryView) -> Result<Box<dyn Mapper>> {
        Err(Error::Corrupt("factory_a is a stub"))
    }

    fn factory_b(_view: MemoryView) -> Result<Box<dyn Mapper>> {
        Err(Error::Corrupt("factory_b is a stub"))
    }

    #[test]
    fn test_builtin_pak_is_registered() {
        assert!(lookup("pak").is_some());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(lookup("PAK").is_some());
        assert!(lookup(".Pak").is_some());
    }

    #[test]
    fn test_lookup_unknown_extension() {
        assert!(lookup("definitely-not-a-container").is_none());
    }

    #[test]
    fn test_register_is_idempotent_for_same_factory() {
        register("idem-test", factory_a).unwrap();
        register("idem-test", factory_a).unwrap();
        assert!(lookup("idem-test").is_some());
    }

    #[test]
    fn test_register_conflict_fails() {
        register("conflict-test", factory_a).unwrap();
        let err = register("conflict-test", factory_b).unwrap_err();
        assert!(matches!(err, Error::DuplicateMapper(ext) if ext == "conflict-test"));
    }

    #[test]
    fn test_register_normalizes_extension() {
        register(".UPPER-test", factory_a).unwrap();
        assert!(lookup("upper-test").is_some());
    }
}
