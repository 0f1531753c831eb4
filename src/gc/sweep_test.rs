use super::*;
use crate::config::CuckooConfig;
use crate::store::memory::MemStore;
use crate::util::hash::sha256_base32;

fn addr(content: &str) -> Address {
    Address(format!("fluree:mem:idx/spot/{}.json", sha256_base32(content.as_bytes())))
}

#[tokio::test]
async fn segment_absent_from_every_other_chain_is_deleted() {
    let store = MemStore::new("mem");
    let a = addr("reclaimable");
    store.write("idx/spot", b"payload".to_vec()).await.unwrap();

    let report = sweep(&store, vec![a.clone()], &[]).await.unwrap();
    assert_eq!(report.deleted, vec![a]);
    assert!(report.retained.is_empty());
}

#[tokio::test]
async fn segment_live_in_another_branch_is_retained() {
    let store = MemStore::new("mem");
    let a = addr("shared-segment");

    let mut other = CuckooChain::new(CuckooConfig::default());
    other.insert(&a);
    let other = Arc::new(RwLock::new(other));

    let report = sweep(&store, vec![a.clone()], &[other]).await.unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(report.retained, vec![a]);
}
