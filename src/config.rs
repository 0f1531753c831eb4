//! Ledger-wide tunables, in `robt::Config`'s builder-struct shape;
//! `IndexConfig` is reused verbatim per tree, plus the cuckoo filter and
//! retention knobs that apply at ledger scope.

use crate::index::IndexConfig;

/// Per-filter cuckoo parameters.
#[derive(Clone, Debug)]
pub struct CuckooConfig {
    pub buckets_per_filter: usize,
    pub load_factor: f64,
    pub max_kicks: usize,
}

pub const DEFAULT_BUCKETS_PER_FILTER: usize = 1 << 14;
pub const DEFAULT_LOAD_FACTOR: f64 = 0.95;
pub const DEFAULT_MAX_KICKS: usize = 500;

impl Default for CuckooConfig {
    fn default() -> CuckooConfig {
        CuckooConfig {
            buckets_per_filter: DEFAULT_BUCKETS_PER_FILTER,
            load_factor: DEFAULT_LOAD_FACTOR,
            max_kicks: DEFAULT_MAX_KICKS,
        }
    }
}

/// Top-level knobs for one ledger: index packing, refresh thresholds,
/// cuckoo filter sizing, and retention depth.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub index: IndexConfig,
    pub cuckoo: CuckooConfig,
    pub max_cartesian_product_size: u64,
}

pub const DEFAULT_MAX_CARTESIAN_PRODUCT_SIZE: u64 = 100_000;

impl Default for LedgerConfig {
    fn default() -> LedgerConfig {
        LedgerConfig::new()
    }
}

impl LedgerConfig {
    pub fn new() -> LedgerConfig {
        LedgerConfig {
            index: IndexConfig::new(),
            cuckoo: CuckooConfig::default(),
            max_cartesian_product_size: DEFAULT_MAX_CARTESIAN_PRODUCT_SIZE,
        }
    }
}
