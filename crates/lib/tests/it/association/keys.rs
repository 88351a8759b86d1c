use docident::{
    association::{
        AssociationKind, ClaimAssociation, LoginInfoAssociation, RoleMembership,
        UserLoginAssociation, keys,
    },
    identity::{Claim, LoginInfo, UserLogin},
};

#[test]
fn test_claim_key_ignores_owner() {
    let for_alice = ClaimAssociation::create(Claim::new("dept", "sales"), ["alice"]);
    let for_bob = ClaimAssociation::create(Claim::new("dept", "sales"), ["bob"]);
    assert_eq!(for_alice.id, for_bob.id);
}

#[test]
fn test_claim_key_covers_every_identity_field() {
    let base = Claim::new("dept", "sales");
    let variants = [
        Claim::new("team", "sales"),
        Claim::new("dept", "support"),
        base.clone().with_value_type("int"),
        base.clone().with_issuer("idp"),
        base.clone().with_original_issuer("upstream"),
    ];
    for variant in &variants {
        assert_ne!(keys::claim_key(&base), keys::claim_key(variant), "{variant:?}");
    }
}

#[test]
fn test_google_login_shapes() {
    // Same provider and key, anonymous then owned by user1
    let anonymous = UserLoginAssociation::derive_key(&UserLogin::anonymous("google", "123"));
    let owned = UserLoginAssociation::derive_key(&UserLogin::owned("user1", "google", "123"));
    assert_eq!(anonymous, "google/123");
    assert_eq!(owned, "google/123/user1");
    assert_ne!(anonymous, owned);

    let info = LoginInfoAssociation::derive_key(&LoginInfo::new("google", "123"));
    assert_ne!(info, anonymous);
}

#[test]
fn test_absent_payload_has_no_key() {
    assert!(keys::derive_key::<RoleMembership>(None).is_none());
    assert!(keys::require_key::<LoginInfoAssociation>(None).is_err());
}
