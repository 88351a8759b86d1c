//! Role store.

use std::{fmt, marker::PhantomData, sync::Arc};

use tokio_util::sync::CancellationToken;

use super::{StoreCore, log_failure, write_result};
use crate::{
    Result,
    association::{ClaimAssociation, keys},
    backend::DocumentBackend,
    check_cancelled,
    config::StoreOptions,
    identity::{Claim, IdentityResult, RoleEntity},
};

/// Persists roles of type `R` and the claims attached to them.
///
/// Role claims use the same shared claim records as user claims.
pub struct RoleStore<R: RoleEntity> {
    pub(super) core: StoreCore,
    _role: PhantomData<fn() -> R>,
}

impl<R: RoleEntity> Clone for RoleStore<R> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _role: PhantomData,
        }
    }
}

impl<R: RoleEntity> fmt::Debug for RoleStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleStore")
            .field("collection", &R::COLLECTION)
            .field("database", &self.core.uow.database())
            .finish()
    }
}

impl<R: RoleEntity> RoleStore<R> {
    /// Creates a store over `backend`. Fails if `options` are invalid.
    pub fn new(backend: Arc<dyn DocumentBackend>, options: &StoreOptions) -> Result<Self> {
        Ok(Self {
            core: StoreCore::new(backend, options)?,
            _role: PhantomData,
        })
    }

    pub async fn create(&self, role: &R, cancel: &CancellationToken) -> Result<IdentityResult> {
        check_cancelled(cancel, "create_role")?;
        write_result("create_role", role.id(), self.core.put(role).await)
    }

    pub async fn update(&self, role: &R, cancel: &CancellationToken) -> Result<IdentityResult> {
        check_cancelled(cancel, "update_role")?;
        write_result("update_role", role.id(), self.core.put(role).await)
    }

    /// Deletes the role document. Membership records still naming it are kept.
    pub async fn delete(&self, role: &R, cancel: &CancellationToken) -> Result<IdentityResult> {
        check_cancelled(cancel, "delete_role")?;
        let result = self.core.delete_ids(vec![role.id().to_string()]).await;
        write_result("delete_role", role.id(), result)
    }

    /// Returns `None` when no role has this ID, including when the ID belongs to
    /// a document of another collection.
    pub async fn find_by_id(&self, role_id: &str, cancel: &CancellationToken) -> Result<Option<R>> {
        check_cancelled(cancel, "find_role_by_id")?;
        self.core
            .get::<R>(role_id)
            .await
            .inspect_err(|err| log_failure("find_role_by_id", err))
    }

    pub async fn find_by_name(
        &self,
        normalized_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<R>> {
        check_cancelled(cancel, "find_role_by_name")?;
        self.core
            .find_unique::<R>(R::NORMALIZED_NAME_FIELD, normalized_name)
            .await
            .inspect_err(|err| log_failure("find_role_by_name", err))
    }

    /// Every stored role.
    pub async fn roles(&self, cancel: &CancellationToken) -> Result<Vec<R>> {
        check_cancelled(cancel, "list_roles")?;
        self.core
            .all::<R>()
            .await
            .inspect_err(|err| log_failure("list_roles", err))
    }

    pub async fn get_claims(&self, role: &R, cancel: &CancellationToken) -> Result<Vec<Claim>> {
        check_cancelled(cancel, "get_role_claims")?;
        self.core
            .payloads_referencing::<ClaimAssociation>(role.id())
            .await
            .inspect_err(|err| log_failure("get_role_claims", err))
    }

    pub async fn add_claim(&self, role: &R, claim: Claim, cancel: &CancellationToken) -> Result<()> {
        check_cancelled(cancel, "add_role_claim")?;
        self.core
            .attach::<ClaimAssociation>(claim, role.id())
            .await
            .map(|_| ())
            .inspect_err(|err| log_failure("add_role_claim", err))
    }

    /// Deletes the whole claim record, including for users holding it.
    pub async fn remove_claim(
        &self,
        role: &R,
        claim: &Claim,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel, "remove_role_claim")?;
        tracing::debug!(role_id = %role.id(), claim_type = %claim.claim_type, "Removing claim record");
        self.core
            .delete_ids(vec![keys::claim_key(claim)])
            .await
            .inspect_err(|err| log_failure("remove_role_claim", err))
    }
}
