use super::*;
use crate::store::test_support::round_trip_write_read;
use std::sync::Arc;

#[tokio::test]
async fn write_then_read_round_trips() {
    round_trip_write_read(Arc::new(MemStore::new("mem"))).await;
}

#[tokio::test]
async fn read_of_unknown_address_is_not_found() {
    let store = MemStore::new("mem");
    let err = store.read(&Address("fluree:mem:missing.json".into())).await.unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
}

#[tokio::test]
async fn list_recursive_filters_by_prefix() {
    let store = MemStore::new("mem");
    store.write("idx/spot", b"a".to_vec()).await.unwrap();
    store.write("idx/psot", b"b".to_vec()).await.unwrap();
    let spot_only = store.list_recursive("idx/spot").await.unwrap();
    assert_eq!(spot_only.len(), 1);
}
