use docident::identity::{LoginInfo, UserLogin};

use crate::helpers::{TestContext, cancel};

#[tokio::test]
async fn test_add_login_then_find_by_login() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;

    ctx.users
        .add_login(&alice, LoginInfo::new("google", "123"), &cancel())
        .await
        .unwrap();

    let found = ctx.users.find_by_login("google", "123", &cancel()).await.unwrap();
    assert_eq!(found, Some(alice.clone()));
    let logins = ctx.users.get_logins(&alice, &cancel()).await.unwrap();
    assert_eq!(logins, vec![LoginInfo::new("google", "123")]);

    let unknown = ctx.users.find_by_login("google", "999", &cancel()).await.unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn test_find_by_login_is_one_session() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    ctx.users
        .add_login(&alice, LoginInfo::new("github", "octo"), &cancel())
        .await
        .unwrap();

    let before = ctx.backend.stats().sessions_opened;
    ctx.users.find_by_login("github", "octo", &cancel()).await.unwrap();
    assert_eq!(ctx.backend.stats().sessions_opened, before + 1);
}

#[tokio::test]
async fn test_remove_login() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    ctx.users
        .add_login(&alice, LoginInfo::new("google", "123"), &cancel())
        .await
        .unwrap();
    ctx.users
        .find_user_login_for(&alice.id, "google", "123", &cancel())
        .await
        .unwrap();

    ctx.users.remove_login(&alice, "google", "123", &cancel()).await.unwrap();

    assert!(ctx.users.get_logins(&alice, &cancel()).await.unwrap().is_empty());
    assert!(ctx.users.find_by_login("google", "123", &cancel()).await.unwrap().is_none());
    // only the account is left
    assert_eq!(ctx.document_count().await, 1);
}

#[tokio::test]
async fn test_anonymous_and_owned_login_shapes_are_distinct() {
    let ctx = TestContext::new();

    let anonymous = ctx.users.find_user_login("google", "123", &cancel()).await.unwrap();
    let owned = ctx
        .users
        .find_user_login_for("user1", "google", "123", &cancel())
        .await
        .unwrap();

    assert_eq!(anonymous, UserLogin::anonymous("google", "123"));
    assert_eq!(owned, UserLogin::owned("user1", "google", "123"));
    assert_eq!(ctx.document_count().await, 2);

    // Both lookups are idempotent
    ctx.users.find_user_login("google", "123", &cancel()).await.unwrap();
    ctx.users
        .find_user_login_for("user1", "google", "123", &cancel())
        .await
        .unwrap();
    assert_eq!(ctx.document_count().await, 2);
}
