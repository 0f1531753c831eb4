//! The refresh pipeline: folds a tree's own persisted content together with
//! its pending novelty into a freshly built tree for the same order.
//!
//! Follows `robt::Builder::from_iter` / `incremental` shape: hand the
//! builder a fully sorted iterator of entries and let it
//! pack leaves and stack branch levels bottom-up, rather than patching the
//! old tree's nodes in place. This trades the narrower "only touch the
//! subtrees novelty actually lands in" optimization for a simpler, always-
//! correct rebuild; every refresh here is a full `scan_all_raw` + merge +
//! rebuild.

use std::sync::Arc;

use crate::error::Result;
use crate::flake::{Flake, IndexOrder};
use crate::index::codec::encode_leaf;
use crate::index::config::IndexConfig;
use crate::index::node::{Bound, Branch, ChildDescriptor, Leaf};
use crate::index::tree::Tree;
use crate::novelty::Novelty;
use crate::store::{Address, Store};

/// Result of folding one order's novelty into its tree.
pub struct RefreshOutcome {
    pub order: IndexOrder,
    /// `None` when the merged flake set is empty (an order with nothing
    /// live left in it, e.g. right after a ledger's only subject is fully
    /// retracted).
    pub root: Option<ChildDescriptor>,
    /// Addresses that were part of the old tree but not the new one, and so
    /// are safe to reclaim once no other branch/commit references them.
    pub garbage: Vec<Address>,
    /// Every node address the new tree references, old or freshly written —
    /// fed into the branch's cuckoo filter chain so cross-branch GC knows
    /// this branch still needs them.
    pub new_addresses: Vec<Address>,
}

/// Rebuild `order`'s tree from its current persisted content plus
/// `novelty`, writing new leaf/branch nodes to `store` as needed.
///
/// `t` is the commit time stamped onto freshly built nodes; it is not used
/// to filter flakes (refresh folds in *all* history, live and retracted
/// alike, so later time-travel queries still have it available).
#[tracing::instrument(level = "debug", skip(store, existing, novelty, config), fields(order = ?order, t))]
pub async fn refresh_order(
    store: Arc<dyn Store>,
    order: IndexOrder,
    existing: &Tree,
    novelty: &Novelty,
    config: &IndexConfig,
    t: u64,
) -> Result<RefreshOutcome> {
    let old_addresses = existing.all_node_addresses().await?;

    let mut merged: Vec<Flake> = existing.scan_all_raw().await?;
    merged.extend(novelty.iter_order(order).cloned());
    merged.sort_by(|a, b| order.compare(a, b));
    merged.dedup_by(|a, b| order.compare(a, b) == std::cmp::Ordering::Equal);
    tracing::trace!(merged_len = merged.len(), "merged existing tree with novelty");

    if merged.is_empty() {
        return Ok(RefreshOutcome {
            order,
            root: None,
            garbage: old_addresses,
            new_addresses: vec![],
        });
    }

    let leaves = pack_leaves(order, t, &merged, config.overflow_bytes);
    let mut level: Vec<ChildDescriptor> = vec![];
    for leaf in &leaves {
        let bytes = encode_leaf(leaf)?;
        let receipt = store
            .write(&format!("idx/{}", order.name()), bytes)
            .await?;
        level.push(ChildDescriptor {
            address: receipt.address,
            is_leaf: true,
            first: leaf.bound.first.clone(),
            rhs: leaf.bound.rhs.clone(),
            size: leaf.flakes.len(),
        });
    }

    while level.len() > 1 {
        level = pack_branch_level(store.as_ref(), order, t, level, config.overflow_children).await?;
    }

    let root = level.into_iter().next();

    // A fresh `Tree` rooted at the just-built root lets us reuse
    // `all_node_addresses` rather than re-deriving the walk here.
    let fresh = Tree::new(store.clone(), order, Arc::new(Default::default()), root.clone());
    let new_addresses = fresh.all_node_addresses().await?;
    let new_address_set: std::collections::HashSet<&str> = new_addresses.iter().map(|a| a.0.as_str()).collect();
    let garbage = old_addresses
        .into_iter()
        .filter(|a| !new_address_set.contains(a.0.as_str()))
        .collect();

    tracing::info!(order = ?order, leaves = leaves.len(), garbage = garbage.len(), "refreshed index order");

    Ok(RefreshOutcome {
        order,
        root,
        garbage,
        new_addresses,
    })
}

/// Split `flakes` (already sorted and deduped in `order`) into leaves no
/// larger than `overflow_bytes`, using the same per-flake footprint estimate
/// the in-memory `Leaf` uses to decide when it has overflowed.
fn pack_leaves(order: IndexOrder, t: u64, flakes: &[Flake], overflow_bytes: usize) -> Vec<Leaf> {
    const FLAKE_FOOTPRINT_ESTIMATE: usize = 96;
    let per_leaf = (overflow_bytes / FLAKE_FOOTPRINT_ESTIMATE).max(1);

    let mut leaves = vec![];
    for chunk in flakes.chunks(per_leaf) {
        let first = chunk.first().cloned().expect("chunks() never yields empty slices");
        leaves.push(Leaf {
            order,
            flakes: chunk.to_vec(),
            bound: Bound { first, rhs: None },
            t,
        });
    }

    // Each leaf's `rhs` is the next leaf's first flake, so the boundary
    // between adjacent leaves is exact even though leaves are built
    // independently above.
    let len = leaves.len();
    for i in 0..len.saturating_sub(1) {
        let next_first = leaves[i + 1].bound.first.clone();
        leaves[i].bound.rhs = Some(next_first);
    }
    leaves
}

/// Group one level of child descriptors into parent branches no larger than
/// `overflow_children`, returning the descriptors for the level above.
async fn pack_branch_level(
    store: &dyn Store,
    order: IndexOrder,
    t: u64,
    children: Vec<ChildDescriptor>,
    overflow_children: usize,
) -> Result<Vec<ChildDescriptor>> {
    use crate::index::codec::encode_branch;

    let mut parents = vec![];
    for group in children.chunks(overflow_children.max(1)) {
        let first = group.first().expect("chunks() never yields empty slices").first.clone();
        let rhs = group.last().and_then(|c| c.rhs.clone());
        let branch = Branch {
            order,
            children: group.to_vec(),
            t,
        };
        let bytes = encode_branch(&branch)?;
        let receipt = store.write(&format!("idx/{}", order.name()), bytes).await?;
        parents.push(ChildDescriptor {
            address: receipt.address,
            is_leaf: false,
            first,
            rhs,
            size: group.iter().map(|c| c.size).sum(),
        });
    }
    Ok(parents)
}

#[cfg(test)]
#[path = "build_test.rs"]
mod build_test;
