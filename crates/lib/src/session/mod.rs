//! Unit-of-work sessions.
//!
//! Every store operation runs inside exactly one backend session:
//!
//! 1. [`UnitOfWork::run`] opens a session on the configured database.
//! 2. The caller's action runs against a typed [`Session`].
//! 3. If the action succeeds the session is committed once; if it fails the
//!    buffered writes are discarded and nothing becomes visible to later
//!    sessions.
//! 4. The session is closed on every path.
//!
//! Sessions are never shared between operations and never outlive the action.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use handle_trait::Handle;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Result,
    backend::{Document, DocumentBackend, DocumentSession, Predicate, errors::BackendError},
    config::StoreOptions,
    identity::Entity,
};

/// Boxed future returned by a session action.
///
/// The future borrows the session for `'a`, so everything else it uses must be
/// owned (moved into the closure).
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Typed view over one open backend session.
///
/// Entities and association records are converted to and from JSON documents
/// here; the backend only ever sees [`Document`]s.
pub struct Session {
    inner: Box<dyn DocumentSession>,
}

impl Session {
    /// Loads an entity by ID.
    pub async fn load<E: Entity>(&mut self, id: &str) -> Result<Option<E>> {
        self.load_from(E::COLLECTION, id).await
    }

    /// Loads a document of `collection` by ID and deserializes its body.
    ///
    /// A document stored under `id` in another collection is an error, not an
    /// absence.
    pub async fn load_from<T: DeserializeOwned>(
        &mut self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>> {
        match self.inner.load(id).await? {
            Some(doc) => decode(collection, doc).map(Some),
            None => Ok(None),
        }
    }

    /// Loads several entities at once, in the order of `ids`.
    ///
    /// Missing IDs are skipped, and so are IDs holding a document of another
    /// collection: reference lists may mix users and roles.
    pub async fn load_many<E: Entity>(&mut self, ids: &[String]) -> Result<Vec<E>> {
        let mut found = self.inner.load_many(ids).await?;
        let mut entities = Vec::with_capacity(found.len());
        for id in ids {
            match found.remove(id) {
                Some(doc) if doc.collection == E::COLLECTION => {
                    entities.push(decode(E::COLLECTION, doc)?);
                }
                Some(doc) => {
                    tracing::trace!(id = %doc.id, collection = %doc.collection, "Skipping document of another collection");
                }
                None => {}
            }
        }
        Ok(entities)
    }

    /// Returns every entity matching `predicate`.
    pub async fn query<E: Entity>(&mut self, predicate: &Predicate) -> Result<Vec<E>> {
        self.query_in(E::COLLECTION, predicate).await
    }

    /// Returns every document of `collection` matching `predicate`, deserialized.
    pub async fn query_in<T: DeserializeOwned>(
        &mut self,
        collection: &str,
        predicate: &Predicate,
    ) -> Result<Vec<T>> {
        self.inner
            .query(collection, predicate)
            .await?
            .into_iter()
            .map(|doc| decode(collection, doc))
            .collect()
    }

    /// Buffers an upsert of `entity` under its own ID.
    pub fn store<E: Entity>(&mut self, entity: &E) -> Result<()> {
        self.store_as(E::COLLECTION, entity.id(), entity)
    }

    /// Buffers an upsert of `value` under an explicit ID.
    pub fn store_as<T: Serialize>(&mut self, collection: &str, id: &str, value: &T) -> Result<()> {
        let body = serde_json::to_value(value).map_err(|source| BackendError::SerializationFailed {
            id: id.to_string(),
            source,
        })?;
        self.inner.store(Document::new(id, collection, body))
    }

    /// Buffers a delete by ID.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.inner.delete(id)
    }
}

fn decode<T: DeserializeOwned>(collection: &str, doc: Document) -> Result<T> {
    if doc.collection != collection {
        return Err(BackendError::CollectionMismatch {
            id: doc.id,
            expected: collection.to_string(),
            actual: doc.collection,
        }
        .into());
    }
    let id = doc.id;
    serde_json::from_value(doc.body)
        .map_err(|source| BackendError::DeserializationFailed { id, source }.into())
}

/// Scopes one backend session per logical operation.
///
/// `UnitOfWork` is a cheap-to-clone handle; every façade holds one.
#[derive(Clone, Handle)]
pub struct UnitOfWork {
    inner: Arc<UnitOfWorkInner>,
}

struct UnitOfWorkInner {
    backend: Arc<dyn DocumentBackend>,
    database: String,
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("backend", &"<DocumentBackend>")
            .field("database", &self.inner.database)
            .finish()
    }
}

impl UnitOfWork {
    /// Sessions will open `options.database_name` on `backend`.
    pub fn new(backend: Arc<dyn DocumentBackend>, options: &StoreOptions) -> Self {
        Self {
            inner: Arc::new(UnitOfWorkInner {
                backend,
                database: options.database_name.clone(),
            }),
        }
    }

    /// The database sessions are opened against.
    pub fn database(&self) -> &str {
        &self.inner.database
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.inner.backend
    }

    /// Runs `action` in a fresh session and returns its value.
    ///
    /// The session is committed only if `action` returns `Ok`, and closed on
    /// every path. A failed commit is returned as the operation's error.
    pub async fn run<T, F>(&self, action: F) -> Result<T>
    where
        T: Send,
        F: for<'s> FnOnce(&'s mut Session) -> SessionFuture<'s, T> + Send,
    {
        let mut session = Session {
            inner: self.inner.backend.open_session(self.database()).await?,
        };

        let outcome = match action(&mut session).await {
            Ok(value) => session.inner.commit().await.map(|()| value),
            Err(err) => {
                tracing::debug!(
                    database = %self.database(),
                    error = %err,
                    "Discarding uncommitted session"
                );
                Err(err)
            }
        };

        if let Err(err) = session.inner.close().await {
            tracing::warn!(database = %self.database(), error = %err, "Failed to close session");
        }
        outcome
    }

    /// Runs `action` in a fresh session for its side effects only.
    pub async fn execute<F>(&self, action: F) -> Result<()>
    where
        F: for<'s> FnOnce(&'s mut Session) -> SessionFuture<'s, ()> + Send,
    {
        self.run(action).await
    }
}
