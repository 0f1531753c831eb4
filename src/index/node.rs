//! In-memory shapes of index tree nodes. These are what
//! [`crate::index::codec`] serializes/deserializes and what
//! [`crate::index::tree`] resolves and traverses; the `comparator` field is
//! intentionally *not* part of the persisted payload (design note: "global
//! default comparators" — comparators are tree-local metadata reconstructed
//! from the index kind on load, never a global).

use std::sync::Arc;

use crate::flake::{Flake, IndexOrder};
use crate::store::Address;

/// Half-open range `[first, rhs)` a node's flakes must fall within,
/// according to the tree's comparator.
#[derive(Clone, Debug)]
pub struct Bound {
    pub first: Flake,
    pub rhs: Option<Flake>,
}

/// A leaf node: a sorted set of flakes plus its boundary.
#[derive(Clone, Debug)]
pub struct Leaf {
    pub order: IndexOrder,
    pub flakes: Vec<Flake>,
    pub bound: Bound,
    pub t: u64,
}

impl Leaf {
    pub fn serialized_size_estimate(&self) -> usize {
        // Rough per-flake footprint used to decide overflow splits. Real
        // encoded size is computed by the codec; this estimate only drives
        // the decision of *whether* to ask for it.
        self.flakes.len() * 96
    }
}

/// A child reference inside a branch node.
#[derive(Clone, Debug)]
pub struct ChildDescriptor {
    pub address: Address,
    pub is_leaf: bool,
    pub first: Flake,
    pub rhs: Option<Flake>,
    pub size: usize,
}

/// A branch node: an ordered list of child descriptors.
#[derive(Clone, Debug)]
pub struct Branch {
    pub order: IndexOrder,
    pub children: Vec<ChildDescriptor>,
    pub t: u64,
}

/// A resolved node, either loaded fresh from storage or reconstructed after
/// folding in novelty. Wrapped in `Arc` so the node cache
/// can hand out shared,
/// immutable references to every reader.
#[derive(Clone, Debug)]
pub enum Node {
    Leaf(Arc<Leaf>),
    Branch(Arc<Branch>),
}

impl Node {
    pub fn t(&self) -> u64 {
        match self {
            Node::Leaf(l) => l.t,
            Node::Branch(b) => b.t,
        }
    }
}
