//! docident: identity persistence for schema-less document stores.
//! This library stores user accounts, roles, claims, logins and tokens in a
//! document store that has no joins or foreign keys.
//!
//! ## Core Concepts
//!
//! * **Backends (`backend::DocumentBackend`)**: A pluggable document store offering point loads, bulk loads, predicate queries, buffered writes and a single commit per session.
//! * **Unit of work (`session::UnitOfWork`)**: Every operation opens one session, commits it once on success and discards it on failure.
//! * **Association records (`association::AssociationRecord`)**: Documents that pair a payload with the IDs of the entities it belongs to. Their IDs are derived from the payload (`association::keys`), so existence can be checked before writing.
//! * **Ensure-or-create (`association::EnsureOrCreate`)**: Idempotent get-or-insert of an association record, with a bounded number of create attempts.
//! * **Reference index (`association::ReferenceIndex`)**: Reverse lookup of every record that references a given ID.
//! * **Stores (`store::UserStore`, `store::RoleStore`)**: The identity-store surface built from the pieces above, generic over the account and role types.

pub mod association;
pub mod backend;
pub mod config;
pub mod constants;
pub mod identity;
pub mod session;
pub mod store;

pub use config::StoreOptions;
pub use identity::{IdentityResult, IdentityRole, IdentityUser};
pub use store::{RoleStore, UserStore};

/// Result type used throughout the docident library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the docident library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller cancelled before the operation started.
    #[error("Operation '{operation}' was cancelled")]
    Cancelled { operation: &'static str },

    /// Structured errors from the document backend
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Structured errors from the association layer
    #[error(transparent)]
    Association(association::AssociationError),

    /// Structured configuration errors
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Backend(_) => "backend",
            Error::Association(_) => "association",
            Error::Config(_) => "config",
            Error::Cancelled { .. } => "cancelled",
        }
    }

    /// Short, stable code for reporting this error in an [`IdentityResult`].
    pub fn code(&self) -> String {
        match self {
            Error::Backend(backend_err) => backend_err.code(),
            Error::Association(association_err) => association_err.code().to_string(),
            Error::Config(_) => "config".to_string(),
            Error::Cancelled { .. } => "cancelled".to_string(),
        }
    }

    /// Check if this error indicates the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Check if this error is a transient store failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_unavailable(),
            _ => false,
        }
    }

    /// Check if the store refused a write.
    pub fn is_rejected(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_rejected(),
            _ => false,
        }
    }

    /// Check if ensure-or-create gave up without seeing the record it stored.
    pub fn is_persistence_invariant_violation(&self) -> bool {
        match self {
            Error::Association(association_err) => {
                association_err.is_persistence_invariant_violation()
            }
            _ => false,
        }
    }

    /// Check if this error is database/backend-related.
    pub fn is_database_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_io_error(),
            Error::Config(config_err) => !config_err.is_invalid_option(),
            _ => false,
        }
    }

    /// Check if this error is configuration-related.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Fails with [`Error::Cancelled`] if `token` is already cancelled.
///
/// Operations call this once at entry, before any I/O.
pub(crate) fn check_cancelled(
    token: &tokio_util::sync::CancellationToken,
    operation: &'static str,
) -> Result<()> {
    if token.is_cancelled() {
        tracing::debug!(operation, "Operation cancelled before start");
        return Err(Error::Cancelled { operation });
    }
    Ok(())
}
