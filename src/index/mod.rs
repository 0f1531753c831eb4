//! The five-order persistent index: node shapes, their JSON codec, the
//! tunables that govern leaf/branch packing, the read path over a persisted
//! tree, and the refresh pipeline that rebuilds a tree from its own content
//! plus novelty.

pub mod build;
pub mod codec;
pub mod config;
pub mod node;
pub mod tree;

pub use build::{refresh_order, RefreshOutcome};
pub use config::IndexConfig;
pub use node::{Bound, Branch, ChildDescriptor, Leaf, Node};
pub use tree::{NodeCache, Tree};
