//! Reverse lookups over association records.

use tokio_util::sync::CancellationToken;

use super::{AssociationKind, AssociationRecord};
use crate::{
    Result, backend::Predicate, check_cancelled, identity::Entity, session::UnitOfWork,
};

/// JSON field holding a record's references.
const REFS_FIELD: &str = "refs";

/// Finds records by the IDs they reference.
///
/// Each lookup is one predicate query in one session; there are no joins.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    uow: UnitOfWork,
}

impl ReferenceIndex {
    pub fn new(uow: UnitOfWork) -> Self {
        Self { uow }
    }

    /// Every record of kind `K` whose refs contain `target`.
    pub async fn records_referencing<K: AssociationKind>(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<AssociationRecord<K::Payload>>> {
        check_cancelled(cancel, "records_referencing")?;
        self.referencing::<K>(target).await
    }

    /// Bulk-loads the entities with the given IDs.
    ///
    /// Missing IDs, and IDs that belong to another collection, are skipped.
    pub async fn load_referenced<E: Entity>(
        &self,
        ids: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>> {
        check_cancelled(cancel, "load_referenced")?;
        self.load_entities::<E>(ids).await
    }

    pub(crate) async fn referencing<K: AssociationKind>(
        &self,
        target: &str,
    ) -> Result<Vec<AssociationRecord<K::Payload>>> {
        let predicate = Predicate::contains(REFS_FIELD, target);
        self.uow
            .run(move |session| {
                Box::pin(async move {
                    session
                        .query_in::<AssociationRecord<K::Payload>>(K::COLLECTION, &predicate)
                        .await
                })
            })
            .await
    }

    pub(crate) async fn load_entities<E: Entity>(&self, mut ids: Vec<String>) -> Result<Vec<E>> {
        // refs may repeat an ID
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(id.clone()));
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.uow
            .run(move |session| Box::pin(async move { session.load_many::<E>(&ids).await }))
            .await
    }
}
