use docident::identity::Claim;

use crate::helpers::{TestContext, cancel, sorted};

#[tokio::test]
async fn test_add_to_role_then_lookups() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    let bob = ctx.create_user("bob").await;

    ctx.users.add_to_role(&alice, "ADMIN", &cancel()).await.unwrap();
    ctx.users.add_to_role(&alice, "EDITOR", &cancel()).await.unwrap();
    ctx.users.add_to_role(&bob, "EDITOR", &cancel()).await.unwrap();

    let roles = ctx.users.get_roles(&alice, &cancel()).await.unwrap();
    assert_eq!(roles, vec!["ADMIN", "EDITOR"]);
    assert!(ctx.users.is_in_role(&alice, "ADMIN", &cancel()).await.unwrap());
    assert!(!ctx.users.is_in_role(&bob, "ADMIN", &cancel()).await.unwrap());

    let editors = ctx.users.get_users_in_role("EDITOR", &cancel()).await.unwrap();
    let names: Vec<String> = editors.into_iter().filter_map(|u| u.user_name).collect();
    assert_eq!(sorted(&names), vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_add_to_role_twice_is_a_no_op() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    ctx.users.add_to_role(&alice, "ADMIN", &cancel()).await.unwrap();
    let commits = ctx.backend.stats().commits;

    ctx.users.add_to_role(&alice, "ADMIN", &cancel()).await.unwrap();

    assert_eq!(ctx.users.get_roles(&alice, &cancel()).await.unwrap(), vec!["ADMIN"]);
    // only the read-only load committed
    assert_eq!(ctx.backend.stats().commits, commits + 1);
}

#[tokio::test]
async fn test_remove_from_role() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    ctx.users.add_to_role(&alice, "ADMIN", &cancel()).await.unwrap();
    ctx.users.add_to_role(&alice, "EDITOR", &cancel()).await.unwrap();

    ctx.users.remove_from_role(&alice, "ADMIN", &cancel()).await.unwrap();
    // Removing a role the user never had is fine
    ctx.users.remove_from_role(&alice, "VIEWER", &cancel()).await.unwrap();

    assert_eq!(ctx.users.get_roles(&alice, &cancel()).await.unwrap(), vec!["EDITOR"]);
    assert!(ctx.users.get_users_in_role("ADMIN", &cancel()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_without_memberships() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    assert!(ctx.users.get_roles(&alice, &cancel()).await.unwrap().is_empty());
    assert!(!ctx.users.is_in_role(&alice, "ADMIN", &cancel()).await.unwrap());
}

#[tokio::test]
async fn test_role_store_crud() {
    let ctx = TestContext::new();
    let mut admin = ctx.create_role("admin").await;

    let found = ctx.roles.find_by_name("ADMIN", &cancel()).await.unwrap();
    assert_eq!(found.as_ref(), Some(&admin));
    assert!(ctx.roles.find_by_name("NONEXISTENT", &cancel()).await.unwrap().is_none());

    admin.name = Some("administrator".to_string());
    admin.normalized_name = Some("ADMINISTRATOR".to_string());
    assert!(ctx.roles.update(&admin, &cancel()).await.unwrap().succeeded());
    let found = ctx.roles.find_by_id(&admin.id, &cancel()).await.unwrap().unwrap();
    assert_eq!(found.name.as_deref(), Some("administrator"));

    assert!(ctx.roles.delete(&admin, &cancel()).await.unwrap().succeeded());
    assert!(ctx.roles.roles(&cancel()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_role_claims() {
    let ctx = TestContext::new();
    let admin = ctx.create_role("admin").await;
    let manage = Claim::new("permission", "manage");
    let audit = Claim::new("permission", "audit");

    ctx.roles.add_claim(&admin, manage.clone(), &cancel()).await.unwrap();
    ctx.roles.add_claim(&admin, audit.clone(), &cancel()).await.unwrap();
    ctx.roles.remove_claim(&admin, &manage, &cancel()).await.unwrap();

    assert_eq!(ctx.roles.get_claims(&admin, &cancel()).await.unwrap(), vec![audit]);
}
