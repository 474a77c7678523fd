//! The container capability and its built-in variants.
//!
//! A [`Mapper`] resolves names to bytes for one container: an OS directory
//! ([`DirectoryMapper`]) or an archive-like format parsed from a memory view
//! ([`PakMapper`]). New archive formats implement the trait and register a
//! factory in the [`registry`](crate::registry); the resolver never learns
//! their concrete types.

mod directory;
pub mod pak;

pub use directory::DirectoryMapper;
pub use pak::PakMapper;

use crate::error::Result;
use crate::memory::MemoryView;

/// Name-to-bytes resolution for one container.
///
/// Implementations are immutable after construction — the parsed index never
/// changes — so a built mapper's methods are safe to call concurrently from
/// multiple threads. A mapper for a nested container holds the [`MemoryView`]
/// of its own container file, which keeps the parent's backing alive without
/// referencing the parent mapper itself.
pub trait Mapper: Send + Sync {
    /// Whether `name` resolves to an entry. Never fails; malformed names
    /// report `false`.
    fn exists(&self, name: &str) -> bool;

    /// Resolve `name` to a read-only view of its contents.
    ///
    /// The view is valid for as long as it is held, independent of the
    /// mapper's lifetime. Entries stored verbatim resolve zero-copy; an
    /// entry the format stores compressed is materialized into a decoded
    /// buffer, at most once per mapper instance.
    fn resolve(&self, name: &str) -> Result<MemoryView>;

    /// Enumerate entry names in the container's natural order.
    ///
    /// The sequence is finite and re-enumerable on the same instance; no
    /// re-sorting is applied.
    fn enumerate(&self) -> Box<dyn Iterator<Item = String> + '_>;
}
