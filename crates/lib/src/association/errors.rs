//! Error types for the association layer.

use thiserror::Error;

/// Errors produced by key derivation and ensure-or-create.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AssociationError {
    /// A record was stored and committed but never became visible.
    #[error("Association '{id}' still absent after {attempts} create attempts")]
    PersistenceInvariantViolation {
        /// The derived record ID
        id: String,
        /// Create+reload cycles performed
        attempts: usize,
    },

    /// There was no payload to derive a key from.
    #[error("No {kind} payload to derive an association key from")]
    MissingKey {
        /// Kind of association requested
        kind: &'static str,
    },
}

impl AssociationError {
    /// Check if ensure-or-create exhausted its attempts.
    pub fn is_persistence_invariant_violation(&self) -> bool {
        matches!(self, AssociationError::PersistenceInvariantViolation { .. })
    }

    /// Check if the payload was absent.
    pub fn is_missing_key(&self) -> bool {
        matches!(self, AssociationError::MissingKey { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            AssociationError::PersistenceInvariantViolation { .. } => {
                "association.persistence_invariant"
            }
            AssociationError::MissingKey { .. } => "association.missing_key",
        }
    }
}

impl From<AssociationError> for crate::Error {
    fn from(err: AssociationError) -> Self {
        crate::Error::Association(err)
    }
}
