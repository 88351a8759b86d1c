use docident::backend::{
    Document, DocumentBackend, DocumentSession, Predicate,
    database::{FaultKind, FaultPoint, InMemory},
};
use serde_json::json;

fn doc(id: &str, collection: &str, body: serde_json::Value) -> Document {
    Document::new(id, collection, body)
}

#[tokio::test]
async fn test_writes_are_invisible_until_commit() {
    let backend = InMemory::new();

    let mut writer = backend.open_session("Identity").await.unwrap();
    writer
        .store(doc("users/1", "Users", json!({ "name": "alice" })))
        .unwrap();

    // Read-your-writes inside the session
    assert!(writer.load("users/1").await.unwrap().is_some());

    let mut reader = backend.open_session("Identity").await.unwrap();
    assert!(reader.load("users/1").await.unwrap().is_none());

    writer.commit().await.unwrap();
    assert!(reader.load("users/1").await.unwrap().is_some());

    writer.close().await.unwrap();
    reader.close().await.unwrap();
    assert_eq!(backend.stats().sessions_open, 0);
}

#[tokio::test]
async fn test_close_discards_uncommitted_writes() {
    let backend = InMemory::new();

    let mut session = backend.open_session("Identity").await.unwrap();
    session.store(doc("a", "Things", json!({}))).unwrap();
    session.close().await.unwrap();
    // Idempotent
    session.close().await.unwrap();

    assert_eq!(backend.document_count("Identity").await, 0);
    assert_eq!(backend.stats().sessions_open, 0);
}

#[tokio::test]
async fn test_commit_only_once() {
    let backend = InMemory::new();
    let mut session = backend.open_session("Identity").await.unwrap();
    session.store(doc("a", "Things", json!({}))).unwrap();
    session.commit().await.unwrap();

    let err = session.commit().await.unwrap_err();
    match err {
        docident::Error::Backend(e) => assert!(e.is_session_error()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.store(doc("b", "Things", json!({}))).is_err());
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_closed_session_rejects_reads() {
    let backend = InMemory::new();
    let mut session = backend.open_session("Identity").await.unwrap();
    session.close().await.unwrap();
    assert!(session.load("a").await.is_err());
}

#[tokio::test]
async fn test_query_filters_by_collection_and_predicate() {
    let backend = InMemory::new();
    let mut session = backend.open_session("Identity").await.unwrap();
    session
        .store(doc("r/1", "Records", json!({ "refs": ["u1", "u2"] })))
        .unwrap();
    session
        .store(doc("r/2", "Records", json!({ "refs": ["u2"] })))
        .unwrap();
    session
        .store(doc("o/1", "Others", json!({ "refs": ["u1"] })))
        .unwrap();
    session.commit().await.unwrap();
    session.close().await.unwrap();

    let mut session = backend.open_session("Identity").await.unwrap();
    let found = session
        .query("Records", &Predicate::contains("refs", "u1"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "r/1");

    let all = session.query("Records", &Predicate::All).await.unwrap();
    assert_eq!(all.len(), 2);

    // Pending deletes hide committed documents from queries
    session.delete("r/2").unwrap();
    let all = session.query("Records", &Predicate::All).await.unwrap();
    assert_eq!(all.len(), 1);
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_load_many_omits_missing_ids() {
    let backend = InMemory::new();
    let mut session = backend.open_session("Identity").await.unwrap();
    session.store(doc("a", "Things", json!(1))).unwrap();
    session.store(doc("b", "Things", json!(2))).unwrap();
    session.commit().await.unwrap();
    session.close().await.unwrap();

    let mut session = backend.open_session("Identity").await.unwrap();
    let ids = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
    let found = session.load_many(&ids).await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.contains_key("a"));
    assert!(!found.contains_key("missing"));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_databases_are_isolated() {
    let backend = InMemory::new();
    let mut session = backend.open_session("Identity").await.unwrap();
    session.store(doc("a", "Things", json!({}))).unwrap();
    session.commit().await.unwrap();
    session.close().await.unwrap();

    let mut other = backend.open_session("Other").await.unwrap();
    assert!(other.load("a").await.unwrap().is_none());
    other.close().await.unwrap();

    assert!(backend.open_session("").await.is_err());
}

#[tokio::test]
async fn test_injected_faults_fire_then_clear() {
    let backend = InMemory::new();
    backend
        .inject_fault(FaultPoint::Load, FaultKind::Unavailable, 1)
        .await;

    let mut session = backend.open_session("Identity").await.unwrap();
    let err = session.load("a").await.unwrap_err();
    assert!(err.is_transient());
    // Consumed
    assert!(session.load("a").await.unwrap().is_none());
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_commit_faults_skip_read_only_sessions() {
    let backend = InMemory::new();
    backend
        .inject_fault(
            FaultPoint::Commit,
            FaultKind::Rejected {
                code: "Conflict".to_string(),
            },
            1,
        )
        .await;

    let mut reader = backend.open_session("Identity").await.unwrap();
    reader.load("a").await.unwrap();
    reader.commit().await.unwrap();
    reader.close().await.unwrap();

    let mut writer = backend.open_session("Identity").await.unwrap();
    writer.store(doc("a", "Things", json!({}))).unwrap();
    let err = writer.commit().await.unwrap_err();
    assert!(err.is_rejected());
    assert_eq!(err.code(), "Conflict");
    writer.close().await.unwrap();

    assert_eq!(backend.document_count("Identity").await, 0);
}

#[tokio::test]
async fn test_drop_writes_acknowledges_without_applying() {
    let backend = InMemory::new();
    backend.drop_writes(1).await;

    let mut session = backend.open_session("Identity").await.unwrap();
    session.store(doc("a", "Things", json!({}))).unwrap();
    session.commit().await.unwrap();
    session.close().await.unwrap();

    assert_eq!(backend.document_count("Identity").await, 0);
    assert_eq!(backend.stats().commits, 1);
}

#[tokio::test]
async fn test_clear_faults() {
    let backend = InMemory::new();
    backend
        .inject_fault(FaultPoint::Query, FaultKind::Unavailable, 5)
        .await;
    backend.clear_faults().await;

    let mut session = backend.open_session("Identity").await.unwrap();
    assert!(session.query("Things", &Predicate::All).await.is_ok());
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_dropped_session_is_released() {
    let backend = InMemory::new();
    {
        let _session = backend.open_session("Identity").await.unwrap();
        assert_eq!(backend.stats().sessions_open, 1);
    }
    assert_eq!(backend.stats().sessions_open, 0);
    assert_eq!(backend.stats().sessions_opened, 1);
}

#[tokio::test]
async fn test_shared_backend_downcasts_to_in_memory() {
    let backend = InMemory::new();
    let shared: std::sync::Arc<dyn DocumentBackend> = std::sync::Arc::new(backend.clone());

    let mut session = shared.open_session("Identity").await.unwrap();
    session.store(doc("a", "Users", json!({}))).unwrap();
    session.commit().await.unwrap();
    session.close().await.unwrap();

    let in_memory = shared
        .as_any()
        .downcast_ref::<InMemory>()
        .expect("backend should be InMemory");
    assert_eq!(in_memory.document_count("Identity").await, 1);
    assert_eq!(backend.stats().sessions_open, 0);
}
