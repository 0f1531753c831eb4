use super::*;
use crate::store::test_support::round_trip_write_read;
use std::sync::Arc;

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("fluree-filestore-{}", rand::random::<u64>()))
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let dir = temp_dir();
    round_trip_write_read(Arc::new(FileStore::new(dir.clone(), "local"))).await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn missing_address_is_not_found() {
    let dir = temp_dir();
    let store = FileStore::new(dir.clone(), "local");
    let err = store
        .read(&Address("fluree:local:idx/missing.json".into()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    std::fs::remove_dir_all(&dir).ok();
}
