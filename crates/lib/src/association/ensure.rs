//! Idempotent get-or-insert of association records.

use tokio_util::sync::CancellationToken;

use super::{AssociationKind, AssociationRecord, errors::AssociationError};
use crate::{Result, check_cancelled, config::StoreOptions, session::UnitOfWork};

/// Ensure-or-create engine.
///
/// Given a candidate record whose ID is already derived:
///
/// 1. Load the ID. If a record is stored there, return it and drop the
///    candidate; the first writer wins.
/// 2. Otherwise store the candidate in its own session, then reload the ID in
///    another and return what was actually committed.
/// 3. If the reload still finds nothing, store and reload again, up to
///    `max_attempts` cycles, then fail with
///    [`AssociationError::PersistenceInvariantViolation`].
///
/// Check and store are separate sessions, so two callers racing on one ID can
/// both store; the backend's last write decides the stored value.
#[derive(Debug, Clone)]
pub struct EnsureOrCreate {
    uow: UnitOfWork,
    max_attempts: usize,
}

impl EnsureOrCreate {
    pub fn new(uow: UnitOfWork, options: &StoreOptions) -> Self {
        Self::with_max_attempts(uow, options.max_ensure_attempts)
    }

    /// At least one create+reload cycle is always performed.
    pub fn with_max_attempts(uow: UnitOfWork, max_attempts: usize) -> Self {
        Self {
            uow,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns the stored record with `candidate.id`, creating it from
    /// `candidate` if absent.
    pub async fn ensure<K: AssociationKind>(
        &self,
        candidate: AssociationRecord<K::Payload>,
        cancel: &CancellationToken,
    ) -> Result<AssociationRecord<K::Payload>> {
        check_cancelled(cancel, "ensure_or_create")?;
        self.run::<K>(candidate).await
    }

    /// Derives the ID of `payload` and ensures a record for it.
    ///
    /// `refs` only matter if the record is created here.
    pub async fn ensure_payload<K, I, S>(
        &self,
        payload: K::Payload,
        refs: I,
        cancel: &CancellationToken,
    ) -> Result<AssociationRecord<K::Payload>>
    where
        K: AssociationKind,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure::<K>(K::create(payload, refs), cancel).await
    }

    /// [`ensure`](Self::ensure) for callers that already checked cancellation.
    pub(crate) async fn run<K: AssociationKind>(
        &self,
        candidate: AssociationRecord<K::Payload>,
    ) -> Result<AssociationRecord<K::Payload>> {
        if candidate.id.is_empty() {
            return Err(AssociationError::MissingKey { kind: K::NAME }.into());
        }

        let id = candidate.id.clone();
        if let Some(stored) = self.load::<K>(&id).await? {
            tracing::trace!(kind = K::NAME, id = %id, "Association already exists");
            return Ok(stored);
        }

        for attempt in 1..=self.max_attempts {
            let record = candidate.clone();
            self.uow
                .execute(move |session| {
                    Box::pin(async move { session.store_as(K::COLLECTION, &record.id, &record) })
                })
                .await?;

            if let Some(stored) = self.load::<K>(&id).await? {
                tracing::debug!(kind = K::NAME, id = %id, attempt, "Created association");
                return Ok(stored);
            }
            tracing::warn!(
                kind = K::NAME,
                id = %id,
                attempt,
                "Stored association not visible on reload"
            );
        }

        tracing::error!(
            kind = K::NAME,
            id = %id,
            attempts = self.max_attempts,
            "Giving up on association that never became visible"
        );
        Err(AssociationError::PersistenceInvariantViolation {
            id,
            attempts: self.max_attempts,
        }
        .into())
    }

    async fn load<K: AssociationKind>(
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
}
