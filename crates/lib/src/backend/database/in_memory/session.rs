//! Sessions against the in-memory store.
//!
//! Writes are buffered in order and applied under one write lock at commit.
//! Reads overlay the buffered writes on top of the committed state.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use super::{FaultKind, FaultPoint, InMemoryState};
use crate::{
    Result,
    backend::{Document, DocumentSession, Predicate, errors::BackendError},
};

#[derive(Debug, Clone)]
enum PendingWrite {
    Store(Document),
    Delete(String),
}

impl PendingWrite {
    fn id(&self) -> &str {
        match self {
            PendingWrite::Store(doc) => &doc.id,
            PendingWrite::Delete(id) => id,
        }
    }
}

#[derive(Debug)]
pub(crate) struct InMemorySession {
    state: Arc<InMemoryState>,
    database: String,
    pending: Vec<PendingWrite>,
    committed: bool,
    closed: bool,
}

impl InMemorySession {
    pub(crate) fn new(state: Arc<InMemoryState>, database: String) -> Self {
        Self {
            state,
            database,
            pending: Vec::new(),
            committed: false,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(BackendError::SessionClosed {
                database: self.database.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_open()?;
        if self.committed {
            return Err(BackendError::SessionAlreadyCommitted {
                database: self.database.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Latest buffered write for `id`: `Some(Some(doc))` for a store,
    /// `Some(None)` for a delete, `None` if untouched in this session.
    fn pending_for(&self, id: &str) -> Option<Option<&Document>> {
        self.pending
            .iter()
            .rev()
            .find(|w| w.id() == id)
            .map(|w| match w {
                PendingWrite::Store(doc) => Some(doc),
                PendingWrite::Delete(_) => None,
            })
    }

    async fn check_fault(&self, point: FaultPoint, operation: &str) -> Result<Option<FaultKind>> {
        match self.state.take_fault(point).await {
            Some(FaultKind::Unavailable) => Err(BackendError::Unavailable {
                operation: operation.to_string(),
                reason: "injected fault".to_string(),
            }
            .into()),
            Some(FaultKind::Rejected { code }) => Err(BackendError::Rejected {
                code,
                reason: format!("injected rejection during {operation}"),
            }
            .into()),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl DocumentSession for InMemorySession {
    async fn load(&mut self, id: &str) -> Result<Option<Document>> {
        self.ensure_open()?;
        self.check_fault(FaultPoint::Load, "load").await?;
        if let Some(pending) = self.pending_for(id) {
            return Ok(pending.cloned());
        }
        let databases = self.state.databases.read().await;
        Ok(databases
            .get(&self.database)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn load_many(&mut self, ids: &[String]) -> Result<HashMap<String, Document>> {
        self.ensure_open()?;
        self.check_fault(FaultPoint::Load, "load_many").await?;
        let databases = self.state.databases.read().await;
        let committed = databases.get(&self.database);
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            let doc = match self.pending_for(id) {
                Some(pending) => pending.cloned(),
                None => committed.and_then(|docs| docs.get(id)).cloned(),
            };
            if let Some(doc) = doc {
                found.insert(id.clone(), doc);
            }
        }
        Ok(found)
    }

    async fn query(&mut self, collection: &str, predicate: &Predicate) -> Result<Vec<Document>> {
        self.ensure_open()?;
        self.check_fault(FaultPoint::Query, "query").await?;
        let mut view: HashMap<String, Document> = {
            let databases = self.state.databases.read().await;
            databases
                .get(&self.database)
                .map(|docs| {
                    docs.values()
                        .filter(|doc| doc.collection == collection)
                        .map(|doc| (doc.id.clone(), doc.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };
        for write in &self.pending {
            match write {
                PendingWrite::Store(doc) if doc.collection == collection => {
                    view.insert(doc.id.clone(), doc.clone());
                }
                other => {
                    view.remove(other.id());
                }
            }
        }
        let mut matches: Vec<Document> = view
            .into_values()
            .filter(|doc| predicate.matches(&doc.body))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }

    fn store(&mut self, document: Document) -> Result<()> {
        self.ensure_writable()?;
        self.pending.push(PendingWrite::Store(document));
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.ensure_writable()?;
        self.pending.push(PendingWrite::Delete(id.to_string()));
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_writable()?;
        // Read-only sessions flush nothing, so commit faults skip them.
        if self.pending.is_empty() {
            self.committed = true;
            self.state.record_commit();
            return Ok(());
        }
        let fault = self.check_fault(FaultPoint::Commit, "commit").await?;
        let writes = std::mem::take(&mut self.pending);
        self.committed = true;

        if fault == Some(FaultKind::DropWrites) {
            tracing::debug!(
                database = %self.database,
                dropped = writes.len(),
                "Commit acknowledged without applying writes"
            );
            self.state.record_commit();
            return Ok(());
        }

        let applied = writes.len();
        let database = self.database.clone();
        self.state
            .apply_commit(move |databases| {
                let docs = databases.entry(database).or_default();
                for write in writes {
                    match write {
                        PendingWrite::Store(doc) => {
                            docs.insert(doc.id.clone(), doc);
                        }
                        PendingWrite::Delete(id) => {
                            docs.remove(&id);
                        }
                    }
                }
            })
            .await?;
        self.state.record_commit();
        tracing::trace!(database = %self.database, applied, "Committed session");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.pending.clear();
            self.state.release_session();
        }
        Ok(())
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::debug!(database = %self.database, "Session dropped without close");
            self.closed = true;
            self.state.release_session();
        }
    }
}
