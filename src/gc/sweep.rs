//! Cross-branch GC sweep: reclaim a branch's garbage only once no other
//! branch's cuckoo filter chain still claims the segment.

use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::gc::cuckoo::CuckooChain;
use crate::store::{Address, Store};

/// Outcome of one sweep: what was actually deleted, and what was retained
/// because some other branch (or a false positive) still claims it.
#[derive(Clone, Debug, Default)]
pub struct GcReport {
    pub deleted: Vec<Address>,
    pub retained: Vec<Address>,
}

/// For each address in `candidates`, delete it from `store` unless it is
/// present in any of `other_branch_chains` — those branches may still be
/// reading through it even though the branch that produced this garbage no
/// longer needs it.
#[tracing::instrument(level = "debug", skip(store, candidates, other_branch_chains), fields(candidates = candidates.len()))]
pub async fn sweep(
    store: &dyn Store,
    candidates: Vec<Address>,
    other_branch_chains: &[Arc<RwLock<CuckooChain>>],
) -> Result<GcReport> {
    let mut report = GcReport::default();
    for address in candidates {
        let still_referenced = other_branch_chains.iter().any(|chain| chain.read().unwrap().contains(&address));
        if still_referenced {
            report.retained.push(address);
            continue;
        }
        store.delete(&address).await?;
        report.deleted.push(address);
    }
    tracing::info!(deleted = report.deleted.len(), retained = report.retained.len(), "gc sweep complete");
    Ok(report)
}

#[cfg(test)]
#[path = "sweep_test.rs"]
mod sweep_test;
