//! Error types for the document backend.
//!
//! These describe what can go wrong while talking to the document store: the
//! store rejecting a write, the store being unreachable, a session being used
//! after it was closed, or a persisted snapshot that cannot be read back.

use thiserror::Error;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// The store could not be reached or failed mid-operation.
    #[error("Document store unavailable during {operation}: {reason}")]
    Unavailable {
        /// The backend operation that failed
        operation: String,
        /// Description of the failure
        reason: String,
    },

    /// The store refused a write.
    #[error("Document store rejected write ({code}): {reason}")]
    Rejected {
        /// Store-specific fault code
        code: String,
        /// Description of the rejection
        reason: String,
    },

    /// A typed load found a document belonging to another collection.
    #[error("Document '{id}' belongs to collection '{actual}', expected '{expected}'")]
    CollectionMismatch {
        /// The document ID
        id: String,
        /// The collection the caller asked for
        expected: String,
        /// The collection the document is stored in
        actual: String,
    },

    /// The session was already closed.
    #[error("Session for database '{database}' is closed")]
    SessionClosed {
        /// The database the session was opened against
        database: String,
    },

    /// `commit` was called twice on the same session.
    #[error("Session for database '{database}' has already been committed")]
    SessionAlreadyCommitted {
        /// The database the session was opened against
        database: String,
    },

    /// Serialization of a document body failed.
    #[error("Serialization failed for document '{id}'")]
    SerializationFailed {
        /// The document ID
        id: String,
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization of a document body failed.
    #[error("Deserialization failed for document '{id}'")]
    DeserializationFailed {
        /// The document ID
        id: String,
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot serialization failed.
    #[error("Snapshot serialization failed")]
    SnapshotFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Check if this error is a transient store failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BackendError::Unavailable { .. })
    }

    /// Check if the store refused a write.
    pub fn is_rejected(&self) -> bool {
        matches!(self, BackendError::Rejected { .. })
    }

    /// Check if a document exists under a different collection than requested.
    pub fn is_collection_mismatch(&self) -> bool {
        matches!(self, BackendError::CollectionMismatch { .. })
    }

    /// Check if this error is about session misuse.
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            BackendError::SessionClosed { .. } | BackendError::SessionAlreadyCommitted { .. }
        )
    }

    /// Check if this error is related to I/O or (de)serialization.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
                | BackendError::SnapshotFailed { .. }
        )
    }

    /// Short, stable code describing this error.
    ///
    /// Rejections carry the store's own code, everything else maps to a
    /// fixed kind name.
    pub fn code(&self) -> String {
        match self {
            BackendError::Rejected { code, .. } => code.clone(),
            BackendError::Unavailable { .. } => "backend.unavailable".to_string(),
            BackendError::CollectionMismatch { .. } => "backend.collection_mismatch".to_string(),
            BackendError::SessionClosed { .. } => "backend.session_closed".to_string(),
            BackendError::SessionAlreadyCommitted { .. } => {
                "backend.session_already_committed".to_string()
            }
            BackendError::SerializationFailed { .. }
            | BackendError::DeserializationFailed { .. }
            | BackendError::SnapshotFailed { .. } => "backend.serialization".to_string(),
            BackendError::FileIo { .. } => "backend.io".to_string(),
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
