//! Common utility functions shared by storage, indexing, and query modules.

pub mod hash;

use std::ops::{Bound, RangeBounds};
use std::{fs, path};

use crate::error::Result;

/// Clone a generic range into owned `Bound<K>` endpoints, the way range
/// queries over the index tree need to carry bounds across an `await` point.
pub fn to_start_end<G, K>(within: G) -> (Bound<K>, Bound<K>)
where
    K: Clone,
    G: RangeBounds<K>,
{
    let start = match within.start_bound() {
        Bound::Included(v) => Bound::Included(v.clone()),
        Bound::Excluded(v) => Bound::Excluded(v.clone()),
        Bound::Unbounded => Bound::Unbounded,
    };
    let end = match within.end_bound() {
        Bound::Included(v) => Bound::Included(v.clone()),
        Bound::Excluded(v) => Bound::Excluded(v.clone()),
        Bound::Unbounded => Bound::Unbounded,
    };
    (start, end)
}

/// Create parent directories (if missing) and write `content` atomically by
/// writing to a sibling temp file and renaming over the target. Used by
/// [`crate::store::file::FileStore`] for writes that must not be observed
/// half-written by a concurrent reader.
pub fn write_file_atomic(path: &path::Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
