use super::*;
use crate::store::memory::MemStore;

fn sample(t: u64, prev: Option<Address>) -> Commit {
    Commit::new(
        t,
        Utc::now(),
        DataRef {
            address: Address(format!("fluree:mem:data/{}.json", t)),
            hash: format!("hash{}", t),
        },
        prev,
    )
}

#[tokio::test]
async fn commit_round_trips_through_storage() {
    let store = MemStore::new("mem");
    let commit = sample(1, None);
    let address = write_commit(&store, &commit).await.unwrap();
    let back = read_commit(&store, &address).await.unwrap();
    assert_eq!(back.t, 1);
}

#[tokio::test]
async fn chain_walk_follows_prev_commit_links() {
    let store = MemStore::new("mem");
    let first = sample(1, None);
    let first_addr = write_commit(&store, &first).await.unwrap();
    let second = sample(2, Some(first_addr));
    let second_addr = write_commit(&store, &second).await.unwrap();

    let chain = walk_chain(&store, &second_addr, 10).await.unwrap();
    assert_eq!(chain.iter().map(|c| c.t).collect::<Vec<_>>(), vec![2, 1]);
}

#[tokio::test]
async fn chain_walk_respects_limit() {
    let store = MemStore::new("mem");
    let first = sample(1, None);
    let first_addr = write_commit(&store, &first).await.unwrap();
    let second = sample(2, Some(first_addr));
    let second_addr = write_commit(&store, &second).await.unwrap();

    let chain = walk_chain(&store, &second_addr, 1).await.unwrap();
    assert_eq!(chain.len(), 1);
}
