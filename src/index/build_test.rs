use super::*;
use crate::flake::Object;
use crate::index::tree::NodeCache;
use crate::sid::Sid;
use crate::store::memory::MemStore;
use futures::StreamExt;

fn flake(s: &str, t: u64, op: bool) -> Flake {
    Flake::new(
        Sid::new(0, s),
        Sid::new(0, "age"),
        Object::Int(t as i64),
        Sid::new(0, "xsd:integer"),
        t,
        op,
        None,
    )
}

fn empty_tree(store: Arc<dyn Store>, order: IndexOrder) -> Tree {
    Tree::new(store, order, Arc::new(NodeCache::new()), None)
}

#[tokio::test]
async fn refresh_builds_a_root_from_novelty_alone() {
    let store: Arc<dyn Store> = Arc::new(MemStore::new("mem"));
    let order = IndexOrder::Spot;
    let existing = empty_tree(store.clone(), order);

    let mut novelty = Novelty::new();
    novelty.add(flake("a", 1, true));
    novelty.add(flake("b", 1, true));

    let config = IndexConfig::new();
    let outcome = refresh_order(store.clone(), order, &existing, &novelty, &config, 1)
        .await
        .unwrap();

    let root = outcome.root.expect("non-empty novelty must produce a root");
    assert!(outcome.garbage.is_empty());

    let rebuilt = Tree::new(store.clone(), order, Arc::new(NodeCache::new()), Some(root));
    let flakes: Vec<_> = rebuilt
        .scan(&Novelty::new(), 1, std::ops::Bound::Unbounded, std::ops::Bound::Unbounded)
        .filter_map(|r| async move { r.ok() })
        .collect()
        .await;
    assert_eq!(flakes.len(), 2);
}

#[tokio::test]
async fn second_refresh_garbage_collects_the_first_roots_nodes() {
    let store: Arc<dyn Store> = Arc::new(MemStore::new("mem"));
    let order = IndexOrder::Spot;
    let existing = empty_tree(store.clone(), order);

    let mut novelty = Novelty::new();
    novelty.add(flake("a", 1, true));
    let config = IndexConfig::new();
    let first = refresh_order(store.clone(), order, &existing, &novelty, &config, 1)
        .await
        .unwrap();
    let first_tree = Tree::new(store.clone(), order, Arc::new(NodeCache::new()), first.root.clone());

    let mut novelty2 = Novelty::new();
    novelty2.add(flake("b", 2, true));
    let second = refresh_order(store.clone(), order, &first_tree, &novelty2, &config, 2)
        .await
        .unwrap();

    // the first root's single leaf is superseded by a new leaf covering
    // both flakes, so it shows up as garbage.
    assert_eq!(second.garbage.len(), 1);
    assert_eq!(second.garbage[0], first.root.unwrap().address);
}

#[tokio::test]
async fn refresh_with_no_flakes_at_all_yields_no_root() {
    let store: Arc<dyn Store> = Arc::new(MemStore::new("mem"));
    let order = IndexOrder::Spot;
    let existing = empty_tree(store.clone(), order);
    let novelty = Novelty::new();
    let config = IndexConfig::new();
    let outcome = refresh_order(store.clone(), order, &existing, &novelty, &config, 1)
        .await
        .unwrap();
    assert!(outcome.root.is_none());
    assert!(outcome.garbage.is_empty());
}
