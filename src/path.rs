//! Path-string grammar shared by the resolver and the mappers.
//!
//! Paths accept `/`, `\` and `:` as equivalent segment separators;
//! consecutive separators collapse. The last separator splits a string into
//! its directory part and its leaf name, and the substring after a segment's
//! final `.` is its extension — the key that selects a container format in
//! the registry.

use std::path::PathBuf;

/// Characters that end a path segment.
const SEPARATORS: &[char] = &['/', '\\', ':'];

/// Split at the last separator into (directory part, leaf name).
///
/// The directory part keeps its trailing separator; a string with no
/// separator is all leaf.
pub(crate) fn split_leaf(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATORS) {
        Some(n) => (&path[..n + 1], &path[n + 1..]),
        None => ("", path),
    }
}

/// Iterate the non-empty segments of a path.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATORS).filter(|s| !s.is_empty())
}

/// The extension of a name: the substring after its final `.`, if any.
pub(crate) fn extension(name: &str) -> Option<&str> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Whether the path names a location from the filesystem root.
pub(crate) fn is_absolute(path: &str) -> bool {
    path.starts_with(['/', '\\'])
}

/// Canonical entry-name form: segments joined with `/`, no trailing slash.
///
/// Used as the lookup key into archive indexes and mapper caches so that
/// `a\b`, `a:b` and `a//b` all address the same entry.
pub(crate) fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for seg in segments(path) {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(seg);
    }
    out
}

/// Join a base ("" or ending in `/`) with a relative path, keeping the
/// directory form: every segment followed by `/`.
pub(crate) fn join_dir(base: &str, rel: &str) -> String {
    let mut out = String::from(base);
    for seg in segments(rel) {
        out.push_str(seg);
        out.push('/');
    }
    out
}

/// Join two canonical entry names, either of which may be empty.
pub(crate) fn join(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{rel}"),
    }
}

/// Convert to an OS path, segment by segment.
///
/// All three separators are honored, so a Windows drive-letter colon reads
/// as a separator here; the grammar is POSIX-oriented.
pub(crate) fn to_native(path: &str) -> PathBuf {
    let mut buf = PathBuf::new();
    if is_absolute(path) {
        buf.push("/");
    }
    for seg in segments(path) {
        buf.push(seg);
    }
    buf
}
