//! Bootstrap helpers that make sure a set of roles and accounts exists.
//!
//! Meant for application startup: each helper looks the entity up by its
//! normalized name and only stores it when nothing is found. Unlike the store
//! façades, faults are returned as errors rather than as [`IdentityResult`]s.
//!
//! [`IdentityResult`]: crate::identity::IdentityResult

use tokio_util::sync::CancellationToken;

use super::{RoleStore, UserStore};
use crate::{
    Result, check_cancelled,
    identity::{RoleEntity, UserAccount},
};

/// Stores every role in `roles` that has no stored role with the same
/// normalized name, and returns the stored version of each.
pub async fn ensure_roles<R: RoleEntity>(
    store: &RoleStore<R>,
    roles: &[R],
    cancel: &CancellationToken,
) -> Result<Vec<R>> {
    check_cancelled(cancel, "ensure_roles")?;
    let mut ensured = Vec::with_capacity(roles.len());
    for role in roles {
        let existing = match role.normalized_name() {
            Some(name) => {
                store
                    .core
                    .find_unique::<R>(R::NORMALIZED_NAME_FIELD, name)
                    .await?
            }
            None => None,
        };
        match existing {
            Some(stored) => ensured.push(stored),
            None => {
                store.core.put(role).await?;
                tracing::info!(role_id = %role.id(), "Seeded role");
                ensured.push(role.clone());
            }
        }
    }
    Ok(ensured)
}

/// Returns the stored account with the normalized name of `user`, storing
/// `user` first if there is none.
pub async fn ensure_user<U: UserAccount>(
    store: &UserStore<U>,
    user: U,
    cancel: &CancellationToken,
) -> Result<U> {
    check_cancelled(cancel, "ensure_user")?;
    if let Some(name) = user.normalized_user_name()
        && let Some(stored) = store
            .core
            .find_unique::<U>(U::NORMALIZED_NAME_FIELD, name)
            .await?
    {
        return Ok(stored);
    }
    store.core.put(&user).await?;
    tracing::info!(user_id = %user.id(), "Seeded user");
    Ok(user)
}

/// Ensures `roles` and `user`, then adds the stored account to each role.
///
/// Roles are recorded by normalized name. Returns the stored account.
pub async fn ensure_user_roles<U: UserAccount, R: RoleEntity>(
    users: &UserStore<U>,
    roles_store: &RoleStore<R>,
    user: U,
    roles: &[R],
    cancel: &CancellationToken,
) -> Result<U> {
    let roles = ensure_roles(roles_store, roles, cancel).await?;
    let user = ensure_user(users, user, cancel).await?;
    for role in &roles {
        match role.normalized_name() {
            Some(name) => users.add_to_role(&user, name, cancel).await?,
            None => tracing::warn!(role_id = %role.id(), "Role has no normalized name, skipping"),
        }
    }
    Ok(user)
}
