use super::*;
use crate::store::memory::MemStore;

fn ledger() -> Ledger {
    let store: Arc<dyn Store> = Arc::new(MemStore::new("mem"));
    Ledger::new("test", store, LedgerConfig::new())
}

#[tokio::test]
async fn insert_then_query_live_view_returns_latest_age() {
    let ledger = ledger();
    ledger.create_branch("main");
    let db0 = ledger.db("main", None).await.unwrap();

    let db1 = ledger
        .insert(
            &db0,
            &[Triple {
                subject: "ex:alice".into(),
                predicate: "schema:age".into(),
                object: Value::Int(30),
            }],
        )
        .await
        .unwrap();
    ledger.commit("main", db1.clone()).await.unwrap();

    let s = ledger.intern("ex:alice");
    let p = ledger.intern("schema:age");
    let current = ledger.db("main", None).await.unwrap();
    let values = ledger.live_values(&current, &s, &p).await.unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].o, Object::Int(30));
}

#[tokio::test]
async fn upsert_retracts_the_previous_value() {
    let ledger = ledger();
    ledger.create_branch("main");
    let db0 = ledger.db("main", None).await.unwrap();
    let db1 = ledger
        .insert(&db0, &[Triple { subject: "ex:alice".into(), predicate: "schema:age".into(), object: Value::Int(30) }])
        .await
        .unwrap();
    ledger.commit("main", db1).await.unwrap();

    let db2 = ledger.db("main", None).await.unwrap();
    let db3 = ledger
        .upsert(&db2, &[Triple { subject: "ex:alice".into(), predicate: "schema:age".into(), object: Value::Int(31) }])
        .await
        .unwrap();
    ledger.commit("main", db3).await.unwrap();

    let s = ledger.intern("ex:alice");
    let p = ledger.intern("schema:age");
    let current = ledger.db("main", None).await.unwrap();
    let values = ledger.live_values(&current, &s, &p).await.unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].o, Object::Int(31));
}

#[tokio::test]
async fn retracting_a_value_with_no_live_assertion_is_rejected() {
    let ledger = ledger();
    ledger.create_branch("main");
    let db0 = ledger.db("main", None).await.unwrap();
    let err = ledger
        .update(
            &db0,
            &[Change::Retract(Triple {
                subject: "ex:alice".into(),
                predicate: "schema:age".into(),
                object: Value::Int(30),
            })],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);
}

#[tokio::test]
async fn history_sees_both_assertion_and_retraction() {
    let ledger = ledger();
    ledger.create_branch("main");
    let db0 = ledger.db("main", None).await.unwrap();
    let db1 = ledger
        .insert(&db0, &[Triple { subject: "ex:alice".into(), predicate: "schema:age".into(), object: Value::Int(30) }])
        .await
        .unwrap();
    ledger.commit("main", db1).await.unwrap();
    let db2 = ledger.db("main", None).await.unwrap();
    let db3 = ledger
        .upsert(&db2, &[Triple { subject: "ex:alice".into(), predicate: "schema:age".into(), object: Value::Int(31) }])
        .await
        .unwrap();
    ledger.commit("main", db3).await.unwrap();

    let current = ledger.db("main", None).await.unwrap();
    let s = ledger.intern("ex:alice");
    let hist = ledger.history(&current, Some(&s), 0..100).await.unwrap();
    assert_eq!(hist.len(), 3, "assert(30), retract(30), assert(31)");
}

#[tokio::test]
async fn db_at_a_historical_t_sees_the_value_live_at_that_time() {
    let ledger = ledger();
    ledger.create_branch("main");
    let db0 = ledger.db("main", None).await.unwrap();
    let db1 = ledger
        .insert(&db0, &[Triple { subject: "ex:alice".into(), predicate: "schema:age".into(), object: Value::Int(30) }])
        .await
        .unwrap();
    let commit1 = ledger.commit("main", db1).await.unwrap();

    let db2 = ledger.db("main", None).await.unwrap();
    let db3 = ledger
        .upsert(&db2, &[Triple { subject: "ex:alice".into(), predicate: "schema:age".into(), object: Value::Int(31) }])
        .await
        .unwrap();
    ledger.commit("main", db3).await.unwrap();

    let s = ledger.intern("ex:alice");
    let p = ledger.intern("schema:age");

    let historical = ledger.db("main", Some(commit1.t)).await.unwrap();
    let at_t1 = ledger.live_values(&historical, &s, &p).await.unwrap();
    assert_eq!(at_t1.len(), 1);
    assert_eq!(at_t1[0].o, Object::Int(30));

    let current = ledger.db("main", None).await.unwrap();
    let now = ledger.live_values(&current, &s, &p).await.unwrap();
    assert_eq!(now.len(), 1);
    assert_eq!(now[0].o, Object::Int(31));
}

#[tokio::test]
async fn db_with_no_t_anchors_on_a_refreshed_commit() {
    let mut config = LedgerConfig::new();
    config.index.reindex_min_bytes = 0;
    let store: Arc<dyn Store> = Arc::new(crate::store::memory::MemStore::new("mem"));
    let ledger = Ledger::new("test", store, config);
    ledger.create_branch("main");
    let db0 = ledger.db("main", None).await.unwrap();
    let db1 = ledger
        .insert(&db0, &[Triple { subject: "ex:alice".into(), predicate: "schema:age".into(), object: Value::Int(30) }])
        .await
        .unwrap();
    let commit1 = ledger.commit("main", db1).await.unwrap();
    assert!(commit1.index.is_some(), "a refresh-triggering commit must anchor a root");

    let s = ledger.intern("ex:alice");
    let p = ledger.intern("schema:age");
    let historical = ledger.db("main", Some(commit1.t)).await.unwrap();
    let values = ledger.live_values(&historical, &s, &p).await.unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].o, Object::Int(30));
}
