//! Identity-store façades.
//!
//! [`UserStore`] and [`RoleStore`] implement the operations an identity
//! framework expects from its account and role stores. They are generic over
//! the account and role types and are instantiated once per concrete type.
//!
//! Conventions shared by every operation:
//!
//! - A [`CancellationToken`](tokio_util::sync::CancellationToken) is checked
//!   once at entry; a cancelled token fails with
//!   [`Error::Cancelled`](crate::Error::Cancelled) before any I/O.
//! - Create, update and delete report backend faults as
//!   [`IdentityResult::Failed`] instead of returning them.
//! - Lookups return `None` when nothing matches. Any other fault is logged and
//!   returned to the caller.
//! - Each backend round trip is its own session. Operations that take several
//!   round trips are not atomic.

use std::sync::Arc;

use crate::{
    Error, Result,
    association::{AssociationKind, AssociationRecord, EnsureOrCreate, ReferenceIndex},
    backend::{DocumentBackend, Predicate},
    config::StoreOptions,
    identity::{Entity, IdentityResult},
    session::UnitOfWork,
};

mod role_store;
pub use role_store::RoleStore;

mod user_store;
pub use user_store::UserStore;

pub mod seed;

/// The building blocks both façades share.
#[derive(Debug, Clone)]
pub(crate) struct StoreCore {
    pub(crate) uow: UnitOfWork,
    pub(crate) ensure: EnsureOrCreate,
    pub(crate) index: ReferenceIndex,
}

impl StoreCore {
    pub(crate) fn new(backend: Arc<dyn DocumentBackend>, options: &StoreOptions) -> Result<Self> {
        options.validate()?;
        let uow = UnitOfWork::new(backend, options);
        Ok(Self {
            ensure: EnsureOrCreate::new(uow.clone(), options),
            index: ReferenceIndex::new(uow.clone()),
            uow,
        })
    }

    /// Upserts `entity` in one session.
    pub(crate) async fn put<E: Entity>(&self, entity: &E) -> Result<()> {
        let entity = entity.clone();
        self.uow
            .execute(move |session| Box::pin(async move { session.store(&entity) }))
            .await
    }

    /// Deletes the documents with the given IDs in one session.
    pub(crate) async fn delete_ids(&self, ids: Vec<String>) -> Result<()> {
        self.uow
            .execute(move |session| {
                Box::pin(async move {
                    for id in &ids {
                        session.delete(id)?;
                    }
                    Ok::<_, Error>(())
                })
            })
            .await
    }

    /// Point lookup. An ID stored under another collection is treated as absent.
    pub(crate) async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>> {
        let id = id.to_string();
        self.uow
            .run(move |session| {
                Box::pin(async move {
                    match session.load::<E>(&id).await {
                        Err(Error::Backend(err)) if err.is_collection_mismatch() => {
                            tracing::debug!(
                                id = %id,
                                collection = E::COLLECTION,
                                error = %err,
                                "ID belongs to another collection"
                            );
                            Ok(None)
                        }
                        other => other,
                    }
                })
            })
            .await
    }

    pub(crate) async fn all<E: Entity>(&self) -> Result<Vec<E>> {
        self.uow
            .run(move |session| Box::pin(async move { session.query::<E>(&Predicate::All).await }))
            .await
    }

    /// First entity whose `field` equals `value`.
    ///
    /// The field is expected to be unique; extra matches are logged and ignored.
    pub(crate) async fn find_unique<E: Entity>(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<Option<E>> {
        let predicate = Predicate::eq(field, value);
        let matches = self
            .uow
            .run(move |session| Box::pin(async move { session.query::<E>(&predicate).await }))
            .await?;
        if matches.len() > 1 {
            tracing::warn!(
                collection = E::COLLECTION,
                field,
                value,
                matches = matches.len(),
                "Expected a unique match, using the first"
            );
        }
        Ok(matches.into_iter().next())
    }

    pub(crate) async fn load_record<K: AssociationKind>(
        &self,
        id: &str,
    ) -> Result<Option<AssociationRecord<K::Payload>>> {
        let id = id.to_string();
        self.uow
            .run(move |session| {
                Box::pin(async move {
                    session
                        .load_from::<AssociationRecord<K::Payload>>(K::COLLECTION, &id)
                        .await
                })
            })
            .await
    }

    /// Overwrites `record` at its ID in one session.
    pub(crate) async fn store_record<K: AssociationKind>(
        &self,
        record: AssociationRecord<K::Payload>,
    ) -> Result<()> {
        self.uow
            .execute(move |session| {
                Box::pin(async move { session.store_as(K::COLLECTION, &record.id, &record) })
            })
            .await
    }

    /// Ensures the record for `payload` exists and references `owner`.
    ///
    /// A record created by another owner is shared: the caller is appended to
    /// its refs with a load-merge-store.
    pub(crate) async fn attach<K: AssociationKind>(
        &self,
        payload: K::Payload,
        owner: &str,
    ) -> Result<AssociationRecord<K::Payload>> {
        let record = self.ensure.run::<K>(K::create(payload, [owner])).await?;
        if record.references(owner) {
            return Ok(record);
        }
        let merged = record.add_refs([owner]);
        tracing::debug!(
            kind = K::NAME,
            id = %merged.id,
            owner,
            "Attaching owner to shared association"
        );
        self.store_record::<K>(merged.clone()).await?;
        Ok(merged)
    }

    /// Payloads of every `K` record referencing `owner`.
    pub(crate) async fn payloads_referencing<K: AssociationKind>(
        &self,
        owner: &str,
    ) -> Result<Vec<K::Payload>> {
        Ok(self
            .index
            .referencing::<K>(owner)
            .await?
            .into_iter()
            .map(|record| record.payload)
            .collect())
    }
}

/// Turns the outcome of a create, update or delete into an [`IdentityResult`].
///
/// Cancellation is still returned as an error.
pub(crate) fn write_result(
    operation: &'static str,
    id: &str,
    result: Result<()>,
) -> Result<IdentityResult> {
    match result {
        Ok(()) => Ok(IdentityResult::Success),
        Err(err) if err.is_cancelled() => Err(err),
        Err(err) => {
            tracing::error!(operation, id, error = %err, "Write rejected");
            Ok(IdentityResult::from(err))
        }
    }
}

/// Logs a failed lookup or association operation before it is returned.
pub(crate) fn log_failure(operation: &'static str, err: &Error) {
    if !err.is_cancelled() {
        tracing::error!(operation, error = %err, "Identity store operation failed");
    }
}
