use docident::{
    IdentityUser,
    association::{ClaimAssociation, EnsureOrCreate, ReferenceIndex, RoleMembership},
    backend::database::{FaultKind, FaultPoint},
    identity::Claim,
};

use crate::helpers::{TestContext, cancel, cancelled, sorted};

#[tokio::test]
async fn test_records_referencing_finds_every_owner_record() {
    let ctx = TestContext::new();
    let engine = EnsureOrCreate::new(ctx.unit_of_work(), &ctx.options);
    let index = ReferenceIndex::new(ctx.unit_of_work());

    for (owner, roles) in [("u1", vec!["ADMIN"]), ("u2", vec!["ADMIN", "EDITOR"]), ("u3", vec!["EDITOR"])] {
        engine
            .ensure_payload::<RoleMembership, _, _>(owner.to_string(), roles, &cancel())
            .await
            .unwrap();
    }

    let admins = index
        .records_referencing::<RoleMembership>("ADMIN", &cancel())
        .await
        .unwrap();
    let owners: Vec<String> = admins.into_iter().map(|r| r.payload).collect();
    assert_eq!(sorted(&owners), vec!["u1", "u2"]);

    let nobody = index
        .records_referencing::<RoleMembership>("VIEWER", &cancel())
        .await
        .unwrap();
    assert!(nobody.is_empty());
}

#[tokio::test]
async fn test_lookup_is_scoped_to_kind() {
    let ctx = TestContext::new();
    let engine = EnsureOrCreate::new(ctx.unit_of_work(), &ctx.options);
    let index = ReferenceIndex::new(ctx.unit_of_work());

    engine
        .ensure_payload::<ClaimAssociation, _, _>(Claim::new("dept", "sales"), ["u1"], &cancel())
        .await
        .unwrap();
    engine
        .ensure_payload::<RoleMembership, _, _>("u1".to_string(), ["u1"], &cancel())
        .await
        .unwrap();

    let claims = index
        .records_referencing::<ClaimAssociation>("u1", &cancel())
        .await
        .unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].payload.value, "sales");
}

#[tokio::test]
async fn test_load_referenced_skips_missing_and_duplicates() {
    let ctx = TestContext::new();
    let alice = ctx.create_user("alice").await;
    let index = ReferenceIndex::new(ctx.unit_of_work());

    let users: Vec<IdentityUser> = index
        .load_referenced(
            vec![alice.id.clone(), "gone".to_string(), alice.id.clone()],
            &cancel(),
        )
        .await
        .unwrap();
    assert_eq!(users, vec![alice]);

    let none: Vec<IdentityUser> = index.load_referenced(Vec::new(), &cancel()).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_query_fault_propagates() {
    let ctx = TestContext::new();
    let index = ReferenceIndex::new(ctx.unit_of_work());
    ctx.backend
        .inject_fault(FaultPoint::Query, FaultKind::Unavailable, 1)
        .await;

    let err = index
        .records_referencing::<ClaimAssociation>("u1", &cancel())
        .await
        .unwrap_err();
    assert!(err.is_transient());

    let err = index
        .records_referencing::<ClaimAssociation>("u1", &cancelled())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
