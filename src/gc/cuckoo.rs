//! Cuckoo filter chain: a per-branch probabilistic membership set over index
//! segment addresses. Cross-branch GC consults another branch's chain to
//! decide whether a segment one branch has marked garbage is still alive
//! somewhere else.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::CuckooConfig;
use crate::store::Address;
use crate::util::hash::{base32_decode, fnv1a};

const SLOTS_PER_BUCKET: usize = 4;
const FINGERPRINT_BITS: u8 = 16;
const PROACTIVE_APPEND_LOAD: f64 = 0.9;

fn address_hash(address: &Address) -> [u8; 32] {
    let decoded = base32_decode(address.hash_segment()).expect("content address hash segment is valid base32");
    let mut out = [0u8; 32];
    out.copy_from_slice(&decoded[..32]);
    out
}

/// Fingerprint plus the two candidate bucket indices for `address`, derived
/// exactly as spelled out for the filter chain: the fingerprint is the first
/// two hash bytes, the primary bucket is FNV-1a of the first eight hash
/// bytes, and the alternate bucket is the primary XORed with FNV-1a of the
/// fingerprint itself — both reduced mod the filter's bucket count.
fn fingerprint_and_primary(address: &Address, num_buckets: usize) -> (u16, usize) {
    let hash = address_hash(address);
    let fingerprint = u16::from_be_bytes([hash[0], hash[1]]);
    let primary = (fnv1a(&hash[0..8]) as usize) % num_buckets;
    (fingerprint, primary)
}

fn alt_bucket(bucket: usize, fingerprint: u16, num_buckets: usize) -> usize {
    (bucket ^ (fnv1a(&fingerprint.to_be_bytes()) as usize)) % num_buckets
}

/// One fixed-capacity filter: `num_buckets` buckets of four 16-bit
/// fingerprint slots apiece.
#[derive(Clone, Debug)]
pub struct CuckooFilter {
    buckets: Vec<[Option<u16>; SLOTS_PER_BUCKET]>,
    count: usize,
    max_kicks: usize,
}

impl CuckooFilter {
    pub fn new(num_buckets: usize, max_kicks: usize) -> CuckooFilter {
        CuckooFilter {
            buckets: vec![[None; SLOTS_PER_BUCKET]; num_buckets.max(1)],
            count: 0,
            max_kicks,
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len() * SLOTS_PER_BUCKET
    }

    pub fn load(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    fn place_if_room(&mut self, bucket: usize, fingerprint: u16) -> bool {
        for slot in self.buckets[bucket].iter_mut() {
            if slot.is_none() {
                *slot = Some(fingerprint);
                return true;
            }
        }
        false
    }

    /// Insert `address`'s fingerprint, returning `false` only if the filter
    /// is still full after `max_kicks` evictions — the caller should then
    /// append a fresh filter to the chain and insert there instead.
    pub fn insert(&mut self, address: &Address) -> bool {
        let (fingerprint, i1) = fingerprint_and_primary(address, self.buckets.len());
        let i2 = alt_bucket(i1, fingerprint, self.buckets.len());

        if self.place_if_room(i1, fingerprint) || self.place_if_room(i2, fingerprint) {
            self.count += 1;
            return true;
        }

        let mut rng = rand::thread_rng();
        let mut bucket = if rng.gen_bool(0.5) { i1 } else { i2 };
        let mut fp = fingerprint;
        for _ in 0..self.max_kicks {
            let slot = rng.gen_range(0..SLOTS_PER_BUCKET);
            let evicted = self.buckets[bucket][slot]
                .replace(fp)
                .expect("kick target bucket was chosen because it had no free slot");
            fp = evicted;
            bucket = alt_bucket(bucket, fp, self.buckets.len());
            if self.place_if_room(bucket, fp) {
                self.count += 1;
                return true;
            }
        }
        // Undo: the last kicked fingerprint is homeless. Put it back where
        // it started so the filter's contents are unchanged on failure.
        self.place_if_room(bucket, fp);
        false
    }

    pub fn contains(&self, address: &Address) -> bool {
        let (fingerprint, i1) = fingerprint_and_primary(address, self.buckets.len());
        let i2 = alt_bucket(i1, fingerprint, self.buckets.len());
        self.buckets[i1].contains(&Some(fingerprint)) || self.buckets[i2].contains(&Some(fingerprint))
    }

    /// Remove one occurrence of `address`'s fingerprint, reporting whether
    /// it was present.
    pub fn remove(&mut self, address: &Address) -> bool {
        let (fingerprint, i1) = fingerprint_and_primary(address, self.buckets.len());
        let i2 = alt_bucket(i1, fingerprint, self.buckets.len());
        for bucket in [i1, i2] {
            if let Some(slot) = self.buckets[bucket].iter_mut().find(|s| **s == Some(fingerprint)) {
                *slot = None;
                self.count -= 1;
                return true;
            }
        }
        false
    }

    fn to_payload(&self) -> FilterPayload {
        FilterPayload {
            fingerprint_bits: FINGERPRINT_BITS,
            buckets: self.buckets.clone(),
            num_buckets: self.buckets.len(),
            count: self.count,
        }
    }

    fn from_payload(payload: FilterPayload, max_kicks: usize) -> CuckooFilter {
        CuckooFilter {
            buckets: payload.buckets,
            count: payload.count,
            max_kicks,
        }
    }
}

/// An ordered chain of filters for one branch. Overflow appends a fresh
/// filter rather than resizing; a filter that empties out is pruned.
#[derive(Clone, Debug)]
pub struct CuckooChain {
    filters: Vec<CuckooFilter>,
    config: CuckooConfig,
}

impl CuckooChain {
    pub fn new(config: CuckooConfig) -> CuckooChain {
        let first = CuckooFilter::new(config.buckets_per_filter, config.max_kicks);
        CuckooChain {
            filters: vec![first],
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.filters.iter().map(|f| f.count()).sum()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.filters.iter().any(|f| f.contains(address))
    }

    /// Insert `address`, appending a new filter if the chain is full, and
    /// proactively appending one if the most recent filter just crossed the
    /// load threshold.
    pub fn insert(&mut self, address: &Address) {
        if self.filters.is_empty() {
            self.filters.push(self.new_filter());
        }
        let last = self.filters.len() - 1;
        if !self.filters[last].insert(address) {
            self.filters.push(self.new_filter());
            let new_last = self.filters.len() - 1;
            let inserted = self.filters[new_last].insert(address);
            debug_assert!(inserted, "a freshly appended empty filter must accept an insert");
        } else if self.filters[last].load() >= PROACTIVE_APPEND_LOAD {
            self.filters.push(self.new_filter());
        }
    }

    pub fn insert_all<'a>(&mut self, addresses: impl IntoIterator<Item = &'a Address>) {
        for address in addresses {
            self.insert(address);
        }
    }

    /// Remove `address` from whichever filter holds it, then prune any
    /// filter left empty (but always keep at least one, so the chain is
    /// never completely bare).
    pub fn remove(&mut self, address: &Address) -> bool {
        let removed = self.filters.iter_mut().any(|f| f.remove(address));
        if removed {
            self.filters.retain(|f| f.count() > 0);
            if self.filters.is_empty() {
                self.filters.push(self.new_filter());
            }
        }
        removed
    }

    pub fn remove_all<'a>(&mut self, addresses: impl IntoIterator<Item = &'a Address>) {
        for address in addresses {
            self.remove(address);
        }
    }

    fn new_filter(&self) -> CuckooFilter {
        CuckooFilter::new(self.config.buckets_per_filter, self.config.max_kicks)
    }

    pub fn to_payload(&self, t: u64) -> FilterChainPayload {
        FilterChainPayload {
            version: 2,
            t,
            filters: self.filters.iter().map(CuckooFilter::to_payload).collect(),
        }
    }

    pub fn from_payload(payload: FilterChainPayload, config: CuckooConfig) -> CuckooChain {
        let filters = payload
            .filters
            .into_iter()
            .map(|f| CuckooFilter::from_payload(f, config.max_kicks))
            .collect();
        CuckooChain { filters, config }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FilterPayload {
    #[serde(rename = "f")]
    pub fingerprint_bits: u8,
    pub buckets: Vec<[Option<u16>; SLOTS_PER_BUCKET]>,
    #[serde(rename = "num-buckets")]
    pub num_buckets: usize,
    pub count: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct FilterChainPayload {
    pub version: u32,
    pub t: u64,
    pub filters: Vec<FilterPayload>,
}

#[cfg(test)]
#[path = "cuckoo_test.rs"]
mod cuckoo_test;
