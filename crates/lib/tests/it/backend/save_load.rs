use std::sync::Arc;

use docident::{
    IdentityUser, StoreOptions, UserStore,
    backend::{Document, DocumentBackend, DocumentSession, database::InMemory},
};
use serde_json::json;
use tempfile::TempDir;

use crate::helpers::cancel;

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("identity.json");

    {
        let backend = InMemory::new();
        let mut session = backend.open_session("Identity").await.unwrap();
        session
            .store(Document::new("a", "Things", json!({ "n": 1 })))
            .unwrap();
        session.commit().await.unwrap();
        session.close().await.unwrap();
        backend.save_to_file(&path).await.unwrap();
    }

    assert!(path.exists());
    let loaded = InMemory::load_from_file(&path).await.unwrap();
    assert_eq!(loaded.document_count("Identity").await, 1);

    let mut session = loaded.open_session("Identity").await.unwrap();
    let doc = session.load("a").await.unwrap().unwrap();
    assert_eq!(doc.collection, "Things");
    assert_eq!(doc.body, json!({ "n": 1 }));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_load_non_existent_file() {
    let dir = TempDir::new().unwrap();
    let backend = InMemory::load_from_file(dir.path().join("missing.json"))
        .await
        .unwrap();
    assert_eq!(backend.document_count("Identity").await, 0);
}

#[tokio::test]
async fn test_load_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = InMemory::load_from_file(&path).await.unwrap_err();
    assert!(err.is_io_error());
}

#[tokio::test]
async fn test_load_unsupported_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("future.json");
    std::fs::write(&path, r#"{ "_v": 7, "databases": {} }"#).unwrap();

    assert!(InMemory::load_from_file(&path).await.is_err());
}

#[tokio::test]
async fn test_persist_on_commit_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let options = StoreOptions::default().with_data_file(dir.path().join("identity.json"));
    let user = IdentityUser::new("alice");

    {
        let backend = InMemory::open(&options).await.unwrap();
        let users: UserStore<IdentityUser> =
            UserStore::new(Arc::new(backend), &options).unwrap();
        assert!(users.create(&user, &cancel()).await.unwrap().succeeded());
        users.add_to_role(&user, "ADMIN", &cancel()).await.unwrap();
    }

    let backend = InMemory::open(&options).await.unwrap();
    let users: UserStore<IdentityUser> = UserStore::new(Arc::new(backend), &options).unwrap();
    let found = users.find_by_id(&user.id, &cancel()).await.unwrap();
    assert_eq!(found, Some(user.clone()));
    assert!(users.is_in_role(&user, "ADMIN", &cancel()).await.unwrap());
}

#[tokio::test]
async fn test_no_persist_on_commit_leaves_file_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("identity.json");
    let options = StoreOptions {
        persist_on_commit: false,
        ..StoreOptions::default().with_data_file(&path)
    };

    let backend = InMemory::open(&options).await.unwrap();
    let users: UserStore<IdentityUser> =
        UserStore::new(Arc::new(backend.clone()), &options).unwrap();
    users
        .create(&IdentityUser::new("bob"), &cancel())
        .await
        .unwrap();

    assert!(!path.exists());
    backend.save_to_file(&path).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_failed_snapshot_leaves_store_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing-dir").join("identity.json");
    let options = StoreOptions::default().with_data_file(&path);

    let backend = InMemory::open(&options).await.unwrap();
    let users: UserStore<IdentityUser> =
        UserStore::new(Arc::new(backend.clone()), &options).unwrap();
    let alice = IdentityUser::new("alice");

    let result = users.create(&alice, &cancel()).await.unwrap();
    assert!(!result.succeeded());
    assert_eq!(result.faults()[0].code, "backend.io");
    assert_eq!(backend.stats().commits, 0);
    assert_eq!(backend.stats().sessions_open, 0);

    // A failed result means nothing became visible
    assert!(users.find_by_id(&alice.id, &cancel()).await.unwrap().is_none());
    assert_eq!(backend.document_count("Identity").await, 0);
    assert!(!path.exists());

    // Once the directory exists the same write goes through
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    assert!(users.create(&alice, &cancel()).await.unwrap().succeeded());
    assert!(users.find_by_id(&alice.id, &cancel()).await.unwrap().is_some());
    assert!(path.exists());
}
