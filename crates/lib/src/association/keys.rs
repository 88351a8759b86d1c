//! Deterministic association keys.
//!
//! A key is built only from the identity fields of a payload, joined with
//! [`KEY_SEPARATOR`]. The same fields always give the same key, whoever derives
//! it and however often, which is what lets ensure-or-create test existence by
//! ID before writing.
//!
//! Each field is escaped before joining (`%` as `%25`, `/` as `%2F`), so a
//! separator inside a field can never shift the field boundaries of a key.

use std::borrow::Cow;

use super::{AssociationKind, errors::AssociationError};
use crate::{
    Result,
    constants::{KEY_SEPARATOR, LOGIN_INFO_PREFIX, ROLE_MEMBERSHIP_PREFIX, TOKEN_PREFIX},
    identity::{Claim, LoginInfo, UserLogin, UserToken},
};

fn escape(part: &str) -> Cow<'_, str> {
    if part.contains(['%', '/']) {
        Cow::Owned(part.replace('%', "%25").replace('/', "%2F"))
    } else {
        Cow::Borrowed(part)
    }
}

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| escape(part))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// `type/value/value_type/issuer/original_issuer`
pub fn claim_key(claim: &Claim) -> String {
    join(&[
        claim.claim_type.as_str(),
        claim.value.as_str(),
        claim.value_type.as_str(),
        claim.issuer.as_str(),
        claim.original_issuer.as_str(),
    ])
}

/// Anonymous login key: `provider/key`.
pub fn anonymous_login_key(login_provider: &str, provider_key: &str) -> String {
    join(&[login_provider, provider_key])
}

/// Owned login key: `provider/key/owner`.
pub fn owned_login_key(login_provider: &str, provider_key: &str, owner_id: &str) -> String {
    join(&[login_provider, provider_key, owner_id])
}

/// `logins/provider/key`
pub fn login_info_key(login: &LoginInfo) -> String {
    join(&[
        LOGIN_INFO_PREFIX,
        login.login_provider.as_str(),
        login.provider_key.as_str(),
    ])
}

/// Owned key when the login has an owner, anonymous key otherwise.
pub fn user_login_key(login: &UserLogin) -> String {
    match &login.user_id {
        Some(owner) => owned_login_key(&login.login_provider, &login.provider_key, owner),
        None => anonymous_login_key(&login.login_provider, &login.provider_key),
    }
}

/// `tokens/owner/provider/name`
pub fn token_key(user_id: &str, login_provider: &str, name: &str) -> String {
    join(&[TOKEN_PREFIX, user_id, login_provider, name])
}

pub fn user_token_key(token: &UserToken) -> String {
    token_key(&token.user_id, &token.login_provider, &token.name)
}

/// `RoleMembership/owner`
pub fn role_membership_key(owner_id: &str) -> String {
    join(&[ROLE_MEMBERSHIP_PREFIX, owner_id])
}

/// Key of `payload` for kind `K`, or `None` when there is no payload.
///
/// Callers must not touch the store when this returns `None`.
pub fn derive_key<K: AssociationKind>(payload: Option<&K::Payload>) -> Option<String> {
    payload.map(K::derive_key)
}

/// Like [`derive_key`], but an absent payload is an [`AssociationError::MissingKey`].
pub fn require_key<K: AssociationKind>(payload: Option<&K::Payload>) -> Result<String> {
    derive_key::<K>(payload).ok_or_else(|| AssociationError::MissingKey { kind: K::NAME }.into())
}
