//! Top-down, on-demand resolution and range scanning over one persisted
//! index tree, with novelty folded in at each leaf.
//!
//! Resolved nodes are cached by content address in a process-wide
//! [`dashmap::DashMap`] — race-free because the key *is* the hash of the
//! content, so two concurrent resolutions of the same node always agree.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, Stream};

use crate::error::Result;
use crate::flake::{Flake, IndexOrder, Object};
use crate::index::codec::{decode_branch, decode_leaf};
use crate::index::node::{ChildDescriptor, Leaf, Node};
use crate::novelty::Novelty;
use crate::sid::Sid;
use crate::store::{Address, Store};

pub type NodeCache = DashMap<Address, Node>;

/// A read-only handle onto one of the five persisted trees.
#[derive(Clone)]
pub struct Tree {
    store: Arc<dyn Store>,
    order: IndexOrder,
    cache: Arc<NodeCache>,
    root: Option<ChildDescriptor>,
}

impl Tree {
    pub fn new(store: Arc<dyn Store>, order: IndexOrder, cache: Arc<NodeCache>, root: Option<ChildDescriptor>) -> Tree {
        Tree {
            store,
            order,
            cache,
            root,
        }
    }

    pub fn order(&self) -> IndexOrder {
        self.order
    }

    pub fn root(&self) -> Option<&ChildDescriptor> {
        self.root.as_ref()
    }

    /// Load a node from storage, merging novelty is *not* done here — that's
    /// [`Tree::merged_leaf_flakes`]'s job, so plain reads stay cacheable.
    pub async fn resolve(&self, desc: &ChildDescriptor) -> Result<Node> {
        if let Some(n) = self.cache.get(&desc.address) {
            return Ok(n.clone());
        }
        let bytes = self.store.read(&desc.address).await?;
        let node = if desc.is_leaf {
            Node::Leaf(Arc::new(decode_leaf(&bytes, self.order)?))
        } else {
            Node::Branch(Arc::new(decode_branch(&bytes, self.order)?))
        };
        self.cache.insert(desc.address.clone(), node.clone());
        Ok(node)
    }

    /// Apply the leaf resolution rule: select novelty flakes in this leaf's
    /// range with `t <= query_t`, fold them in with the persisted leaf
    /// flakes, keep only the greatest-`t` flake per `(s,p,o,dt)`, drop
    /// retractions.
    fn merged_leaf_flakes(&self, leaf: &Leaf, novelty: &Novelty, query_t: u64) -> Vec<Flake> {
        let novelty_slice = novelty.slice(self.order, &leaf.bound.first, leaf.bound.rhs.as_ref());
        merge_live(leaf.flakes.iter().chain(novelty_slice.iter()), query_t, self.order)
    }

    /// Stream every live flake in `[lo, hi)` as of `query_t`, resolving
    /// nodes lazily.
    pub fn scan<'a>(
        &'a self,
        novelty: &'a Novelty,
        query_t: u64,
        lo: Bound<Flake>,
        hi: Bound<Flake>,
    ) -> impl Stream<Item = Result<Flake>> + 'a {
        let initial = ScanState {
            tree: self,
            novelty,
            query_t,
            lo,
            hi,
            stack: self.root.clone().into_iter().collect(),
            buffer: Default::default(),
            done: self.root.is_none(),
        };
        stream::unfold(initial, |mut state| async move {
            loop {
                if let Some(flake) = state.buffer.pop_front() {
                    return Some((Ok(flake), state));
                }
                if state.done {
                    return None;
                }
                let Some(desc) = state.stack.pop() else {
                    state.done = true;
                    continue;
                };
                if !overlaps(state.tree.order, &desc, &state.lo, &state.hi) {
                    continue;
                }
                let node = match state.tree.resolve(&desc).await {
                    Ok(n) => n,
                    Err(e) => return Some((Err(e), state)),
                };
                match node {
                    Node::Branch(branch) => {
                        // push in reverse so children are visited left-to-right
                        for child in branch.children.iter().rev() {
                            state.stack.push(child.clone());
                        }
                    }
                    Node::Leaf(leaf) => {
                        let mut flakes = state.tree.merged_leaf_flakes(&leaf, state.novelty, state.query_t);
                        flakes.retain(|f| in_range(state.tree.order, f, &state.lo, &state.hi));
                        state.buffer.extend(flakes);
                    }
                }
            }
        })
    }

    /// Depth-first walk of every persisted leaf's raw flakes (no novelty
    /// folded in, no liveness filtering) — the refresh pipeline's starting
    /// point for rebuilding a tree from its own current content.
    pub async fn scan_all_raw(&self) -> Result<Vec<Flake>> {
        let mut out = vec![];
        let mut stack: Vec<ChildDescriptor> = self.root.clone().into_iter().collect();
        while let Some(desc) = stack.pop() {
            match self.resolve(&desc).await? {
                Node::Branch(branch) => {
                    for child in branch.children.iter().rev() {
                        stack.push(child.clone());
                    }
                }
                Node::Leaf(leaf) => out.extend(leaf.flakes.iter().cloned()),
            }
        }
        Ok(out)
    }

    /// Every node address reachable from the current root, leaves and
    /// branches alike — used to diff "old tree" against "new tree" when
    /// computing a refresh's garbage set.
    pub async fn all_node_addresses(&self) -> Result<Vec<Address>> {
        let mut out = vec![];
        let mut stack: Vec<ChildDescriptor> = self.root.clone().into_iter().collect();
        while let Some(desc) = stack.pop() {
            out.push(desc.address.clone());
            if let Node::Branch(branch) = self.resolve(&desc).await? {
                for child in branch.children.iter() {
                    stack.push(child.clone());
                }
            }
        }
        Ok(out)
    }
}

struct ScanState<'a> {
    tree: &'a Tree,
    novelty: &'a Novelty,
    query_t: u64,
    lo: Bound<Flake>,
    hi: Bound<Flake>,
    stack: Vec<ChildDescriptor>,
    buffer: std::collections::VecDeque<Flake>,
    done: bool,
}

/// Collapse a flake history down to "live at `query_t`" view: for every
/// `(s,p,o,dt)` keep the greatest-`t` flake with `t <= query_t`, dropping it
/// if that flake is a retraction, then re-sort in the
/// tree's order (the inputs may interleave leaf flakes and novelty in a
/// different relative order than the final dedup implies).
fn merge_live<'a>(
    flakes: impl Iterator<Item = &'a Flake>,
    query_t: u64,
    order: IndexOrder,
) -> Vec<Flake> {
    let mut latest: BTreeMap<(Sid, Sid, Object, Sid), &Flake> = BTreeMap::new();
    for f in flakes {
        if f.t > query_t {
            continue;
        }
        let key = f.spot_key();
        match latest.get(&key) {
            Some(cur) if cur.t >= f.t => {}
            _ => {
                latest.insert(key, f);
            }
        }
    }
    let mut out: Vec<Flake> = latest.into_values().filter(|f| f.op).cloned().collect();
    out.sort_by(|a, b| order.compare(a, b));
    out
}

fn in_range(order: IndexOrder, f: &Flake, lo: &Bound<Flake>, hi: &Bound<Flake>) -> bool {
    let above_lo = match lo {
        Bound::Unbounded => true,
        Bound::Included(l) => order.compare(f, l) != std::cmp::Ordering::Less,
        Bound::Excluded(l) => order.compare(f, l) == std::cmp::Ordering::Greater,
    };
    let below_hi = match hi {
        Bound::Unbounded => true,
        Bound::Included(h) => order.compare(f, h) != std::cmp::Ordering::Greater,
        Bound::Excluded(h) => order.compare(f, h) == std::cmp::Ordering::Less,
    };
    above_lo && below_hi
}

/// Whether a child's `[first, rhs)` coverage could contain anything in
/// `[lo, hi)` — used to prune subtrees during descent.
fn overlaps(order: IndexOrder, desc: &ChildDescriptor, lo: &Bound<Flake>, hi: &Bound<Flake>) -> bool {
    let child_ends_before_lo = match (lo, &desc.rhs) {
        (Bound::Unbounded, _) | (_, None) => false,
        (Bound::Included(l), Some(rhs)) => order.compare(rhs, l) != std::cmp::Ordering::Greater,
        (Bound::Excluded(l), Some(rhs)) => order.compare(rhs, l) != std::cmp::Ordering::Greater,
    };
    let child_starts_after_hi = match hi {
        Bound::Unbounded => false,
        Bound::Included(h) => order.compare(&desc.first, h) == std::cmp::Ordering::Greater,
        Bound::Excluded(h) => order.compare(&desc.first, h) != std::cmp::Ordering::Less,
    };
    !child_ends_before_lo && !child_starts_after_hi
}

/// Build a single-leaf tree (used by tests and by small/just-built ledgers
/// before their first refresh has ever split a leaf).
pub fn single_leaf_root(location: &str, leaf: &Leaf) -> Result<(ChildDescriptor, Vec<u8>)> {
    use crate::index::codec::encode_leaf;
    let bytes = encode_leaf(leaf)?;
    let address = Address::content_addressed(location, &format!("idx/{}", leaf.order.name()), &bytes);
    Ok((
        ChildDescriptor {
            address,
            is_leaf: true,
            first: leaf.bound.first.clone(),
            rhs: leaf.bound.rhs.clone(),
            size: leaf.flakes.len(),
        },
        bytes,
    ))
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
