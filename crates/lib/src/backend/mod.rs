//! Document backend abstraction for docident.
//!
//! This module defines the [`DocumentBackend`] and [`DocumentSession`] traits
//! that the identity layer talks to. A backend is a schema-less document store
//! that offers point loads, bulk loads, predicate-filtered queries, buffered
//! upserts and deletes, and a single flush per session. It offers no joins,
//! foreign keys or multi-session transactions; the `association` module builds
//! those guarantees on top.
//!
//! Backend implementations live under [`database`].

use std::{any::Any, collections::HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

pub mod database;
pub mod errors;
pub mod predicate;

pub use errors::BackendError;
pub use predicate::Predicate;

/// A stored document: an ID, the collection it belongs to, and a JSON body.
///
/// IDs share a single namespace per database regardless of collection, so
/// storing two documents with the same ID in different collections replaces
/// the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub collection: String,
    pub body: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, collection: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            body,
        }
    }
}

/// Backend trait abstracting the underlying document store.
///
/// All backend implementations must be `Send` and `Sync` so a single backend
/// can be shared by every store façade, and implement `Any` to allow for
/// downcasting in tests.
#[async_trait]
pub trait DocumentBackend: Send + Sync + Any {
    /// Opens a new session against the named database.
    ///
    /// Every session must be closed with [`DocumentSession::close`] once the
    /// caller is done with it, whether or not it was committed.
    async fn open_session(&self, database: &str) -> Result<Box<dyn DocumentSession>>;

    /// Returns a reference to the backend instance as a dynamic `Any` type.
    fn as_any(&self) -> &dyn Any;
}

/// One connection to the store, buffering writes until [`commit`](DocumentSession::commit).
///
/// Reads inside a session see that session's own pending writes.
#[async_trait]
pub trait DocumentSession: Send {
    /// Loads a document by ID. `Ok(None)` when absent.
    async fn load(&mut self, id: &str) -> Result<Option<Document>>;

    /// Loads several documents at once. Missing IDs are omitted from the map.
    async fn load_many(&mut self, ids: &[String]) -> Result<HashMap<String, Document>>;

    /// Returns every document in `collection` matching `predicate`.
    async fn query(&mut self, collection: &str, predicate: &Predicate) -> Result<Vec<Document>>;

    /// Buffers an upsert of `document` under its own ID.
    fn store(&mut self, document: Document) -> Result<()>;

    /// Buffers a delete. Deleting an absent ID is not an error.
    fn delete(&mut self, id: &str) -> Result<()>;

    /// Flushes all buffered writes. May be called at most once.
    async fn commit(&mut self) -> Result<()>;

    /// Releases the session. Uncommitted writes are discarded. Idempotent.
    async fn close(&mut self) -> Result<()>;
}
