//! # nestfs
//!
//! A read-only virtual filesystem that resolves one textual path through any
//! number of nested containers — OS directories and archive files — into a
//! zero-copy memory view.
//!
//! One string addresses the whole chain: a segment whose extension names a
//! registered container format is a boundary, everything else is ordinary
//! traversal. Resolution shares expensive work across lookups:
//!
//! - **Mappings**: files resolve to read-only OS memory mappings, not reads
//! - **Archive indexes**: parsed once per container, cached along the chain
//! - **Nested entries**: stored entries are sub-views of the parent's bytes;
//!   only formats that compress ever copy
//!
//! ## Quick Start
//!
//! ```ignore
//! use nestfs::{Dir, File};
//!
//! // A plain file…
//! let config = File::open("assets/config.json")?;
//!
//! // …an entry inside an archive inside a directory…
//! let sky = File::open("assets/textures.pak/env/sky.ktx")?;
//!
//! // …or the same entry relative to a resolved location, reusing the
//! // archive index the first lookup built.
//! let textures = Dir::open("assets/textures.pak")?;
//! let sky2 = File::open_in(&textures, "env/sky.ktx")?;
//! assert_eq!(sky.data(), sky2.data());
//! ```
//!
//! `/`, `\` and `:` are equivalent separators, and extension matching is
//! case-insensitive. Consumers that decode the bytes (image loaders, etc.)
//! receive a [`MemoryView`] and never learn how it was produced.
//!
//! ## Registering a container format
//!
//! Formats plug in at startup through the [`registry`]; the resolver never
//! learns their concrete types:
//!
//! ```ignore
//! nestfs::register("wad", |view| Ok(Box::new(WadMapper::new(view)?)))?;
//! ```
//!
//! ## Modules
//!
//! - [`file`]: the [`File`] façade — resolve once, own the bytes
//! - [`resolver`]: [`Dir`] locations and the container-walking core
//! - [`mapper`]: the [`Mapper`] capability, directory and archive variants
//! - [`registry`]: extension → mapper-factory table
//! - [`memory`]: [`MemoryView`], the unit of data exchange
//! - [`error`]: the error taxonomy

#![warn(missing_docs)]

mod path;

pub mod error;
pub mod file;
pub mod mapper;
pub mod memory;
pub mod registry;
pub mod resolver;

pub use error::{Error, Result};
pub use file::File;
pub use mapper::{DirectoryMapper, Mapper, PakMapper};
pub use memory::MemoryView;
pub use registry::{MapperFactory, lookup, register};
pub use resolver::Dir;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use nestfs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Dir, Error, File, Mapper, MemoryView, Result, register};
}
