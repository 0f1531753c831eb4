use super::*;
use crate::util::hash::sha256_base32;

fn addr(content: &str) -> Address {
    Address(format!("fluree:mem:idx/spot/{}.json", sha256_base32(content.as_bytes())))
}

#[test]
fn insert_then_contains_is_true() {
    let mut filter = CuckooFilter::new(64, 500);
    let a = addr("segment-a");
    assert!(filter.insert(&a));
    assert!(filter.contains(&a));
}

#[test]
fn remove_makes_contains_false_unless_duplicate_present() {
    let mut filter = CuckooFilter::new(64, 500);
    let a = addr("segment-b");
    filter.insert(&a);
    assert!(filter.remove(&a));
    assert!(!filter.contains(&a));
}

#[test]
fn chain_overflows_into_a_new_filter_when_full() {
    let config = CuckooConfig {
        buckets_per_filter: 2,
        load_factor: 0.95,
        max_kicks: 50,
    };
    let mut chain = CuckooChain::new(config);
    for i in 0..50 {
        chain.insert(&addr(&format!("overflow-segment-{}", i)));
    }
    assert!(chain.len() > 1, "a two-bucket filter must overflow well before 50 inserts");
    assert_eq!(chain.total_count(), 50);
}

#[test]
fn chain_prunes_empty_filters_after_remove() {
    let config = CuckooConfig {
        buckets_per_filter: 2,
        load_factor: 0.95,
        max_kicks: 50,
    };
    let mut chain = CuckooChain::new(config);
    let addresses: Vec<Address> = (0..20).map(|i| addr(&format!("prune-segment-{}", i))).collect();
    chain.insert_all(&addresses);
    assert!(chain.len() > 1);
    chain.remove_all(&addresses);
    assert_eq!(chain.total_count(), 0);
}

#[test]
fn payload_round_trips_filter_contents() {
    let config = CuckooConfig::default();
    let mut chain = CuckooChain::new(config.clone());
    let a = addr("round-trip-segment");
    chain.insert(&a);

    let payload = chain.to_payload(7);
    let bytes = serde_json::to_vec(&payload).unwrap();
    let back: FilterChainPayload = serde_json::from_slice(&bytes).unwrap();
    let restored = CuckooChain::from_payload(back, config);
    assert!(restored.contains(&a));
}
