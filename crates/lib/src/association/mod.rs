//! Association records: relational links in a store without joins.
//!
//! An [`AssociationRecord`] pairs a payload with the IDs of the entities it is
//! attached to (`refs`). Its ID is derived from the payload by the record's
//! [`AssociationKind`], so two logically identical payloads always land on the
//! same document. On top of that:
//!
//! - [`EnsureOrCreate`] is an idempotent get-or-insert keyed by that ID.
//! - [`ReferenceIndex`] finds every record whose `refs` contains a given ID.
//!
//! Records are values. Every change returns a new record; nothing is written
//! until a caller stores the result inside a session.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    constants::{
        CLAIM_ASSOCIATIONS, LOGIN_INFO_ASSOCIATIONS, ROLE_MEMBERSHIPS, TOKEN_ASSOCIATIONS,
        USER_LOGIN_ASSOCIATIONS,
    },
    identity::{Claim, LoginInfo, UserLogin, UserToken},
};

pub mod ensure;
pub mod errors;
pub mod index;
pub mod keys;

pub use ensure::EnsureOrCreate;
pub use errors::AssociationError;
pub use index::ReferenceIndex;

/// A payload plus the IDs of the entities it belongs to.
///
/// `refs` may contain duplicates; its order carries no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord<P> {
    pub id: String,
    pub payload: P,
    #[serde(default)]
    pub refs: Vec<String>,
}

impl<P: Clone> AssociationRecord<P> {
    pub fn new<I, S>(id: impl Into<String>, payload: P, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            payload,
            refs: refs.into_iter().map(Into::into).collect(),
        }
    }

    /// Same payload and refs under another ID.
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: self.payload.clone(),
            refs: self.refs.clone(),
        }
    }

    /// Same ID and refs with another payload.
    pub fn with_payload(&self, payload: P) -> Self {
        Self {
            id: self.id.clone(),
            payload,
            refs: self.refs.clone(),
        }
    }

    /// A copy with `ids` appended to `refs`. Existing entries are not checked.
    pub fn add_refs<I, S>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut refs = self.refs.clone();
        refs.extend(ids.into_iter().map(Into::into));
        Self {
            id: self.id.clone(),
            payload: self.payload.clone(),
            refs,
        }
    }

    /// A copy with every entry equal to one of `ids` removed.
    pub fn remove_refs<I, S>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed: Vec<S> = ids.into_iter().collect();
        let refs = self
            .refs
            .iter()
            .filter(|r| !removed.iter().any(|id| id.as_ref() == r.as_str()))
            .cloned()
            .collect();
        Self {
            id: self.id.clone(),
            payload: self.payload.clone(),
            refs,
        }
    }

    /// Whether `id` is among the refs.
    pub fn references(&self, id: &str) -> bool {
        self.refs.iter().any(|r| r == id)
    }
}

/// One kind of association: its payload type, collection and key derivation.
///
/// Kinds are zero-sized markers resolved at compile time.
pub trait AssociationKind: Send + Sync + 'static {
    type Payload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Collection the records are stored in.
    const COLLECTION: &'static str;

    /// Human-readable kind name, used in errors and logs.
    const NAME: &'static str;

    /// Deterministic ID for `payload`.
    fn derive_key(payload: &Self::Payload) -> String;

    /// Candidate record for `payload` under its derived ID.
    fn create<I, S>(payload: Self::Payload, refs: I) -> AssociationRecord<Self::Payload>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = Self::derive_key(&payload);
        AssociationRecord::new(id, payload, refs)
    }
}

/// Claims, shared by every user and role holding them.
#[derive(Debug, Clone, Copy)]
pub struct ClaimAssociation;

impl AssociationKind for ClaimAssociation {
    type Payload = Claim;
    const COLLECTION: &'static str = CLAIM_ASSOCIATIONS;
    const NAME: &'static str = "claim";

    fn derive_key(payload: &Claim) -> String {
        keys::claim_key(payload)
    }
}

/// External logins as attached by `add_login`, one record per provider and key.
#[derive(Debug, Clone, Copy)]
pub struct LoginInfoAssociation;

impl AssociationKind for LoginInfoAssociation {
    type Payload = LoginInfo;
    const COLLECTION: &'static str = LOGIN_INFO_ASSOCIATIONS;
    const NAME: &'static str = "login info";

    fn derive_key(payload: &LoginInfo) -> String {
        keys::login_info_key(payload)
    }
}

/// External logins in their anonymous or owned shape.
#[derive(Debug, Clone, Copy)]
pub struct UserLoginAssociation;

impl AssociationKind for UserLoginAssociation {
    type Payload = UserLogin;
    const COLLECTION: &'static str = USER_LOGIN_ASSOCIATIONS;
    const NAME: &'static str = "user login";

    fn derive_key(payload: &UserLogin) -> String {
        keys::user_login_key(payload)
    }
}

/// Authentication tokens, one record per owner, provider and name.
#[derive(Debug, Clone, Copy)]
pub struct TokenAssociation;

impl AssociationKind for TokenAssociation {
    type Payload = UserToken;
    const COLLECTION: &'static str = TOKEN_ASSOCIATIONS;
    const NAME: &'static str = "token";

    fn derive_key(payload: &UserToken) -> String {
        keys::user_token_key(payload)
    }
}

/// An owner's roles: payload is the owner ID, refs are role names.
#[derive(Debug, Clone, Copy)]
pub struct RoleMembership;

impl AssociationKind for RoleMembership {
    type Payload = String;
    const COLLECTION: &'static str = ROLE_MEMBERSHIPS;
    const NAME: &'static str = "role membership";

    fn derive_key(owner_id: &String) -> String {
        keys::role_membership_key(owner_id)
    }
}
