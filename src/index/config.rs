//! Tunables for the index tree and its refresh pipeline, in `robt::Config`'s
//! shape: a plain struct with `set_*` builder methods and named constants
//! for the defaults.

/// Default leaf overflow threshold, ~500 KiB.
pub const OVERFLOW_BYTES: usize = 500 * 1024;
/// Default branch child-count overflow threshold.
pub const OVERFLOW_CHILDREN: usize = 500;
/// Default novelty size that triggers a refresh.
pub const REINDEX_MIN_BYTES: usize = 8 * 1024 * 1024;
/// Default novelty size past which new commits block.
pub const REINDEX_MAX_BYTES: usize = 64 * 1024 * 1024;
/// Default number of index roots retained per branch before becoming GC
/// eligible.
pub const KEEP_ROOTS: usize = 4;

#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub overflow_bytes: usize,
    pub overflow_children: usize,
    pub reindex_min_bytes: usize,
    pub reindex_max_bytes: usize,
    pub keep_roots: usize,
}

impl Default for IndexConfig {
    fn default() -> IndexConfig {
        IndexConfig {
            overflow_bytes: OVERFLOW_BYTES,
            overflow_children: OVERFLOW_CHILDREN,
            reindex_min_bytes: REINDEX_MIN_BYTES,
            reindex_max_bytes: REINDEX_MAX_BYTES,
            keep_roots: KEEP_ROOTS,
        }
    }
}

impl IndexConfig {
    pub fn new() -> IndexConfig {
        IndexConfig::default()
    }

    pub fn set_overflow(&mut self, bytes: usize, children: usize) -> &mut Self {
        self.overflow_bytes = bytes;
        self.overflow_children = children;
        self
    }

    pub fn set_reindex_thresholds(&mut self, min_bytes: usize, max_bytes: usize) -> &mut Self {
        self.reindex_min_bytes = min_bytes;
        self.reindex_max_bytes = max_bytes;
        self
    }

    pub fn set_keep_roots(&mut self, n: usize) -> &mut Self {
        self.keep_roots = n;
        self
    }
}
