//! In-memory document store implementation
//!
//! This module provides an in-memory implementation of the [`DocumentBackend`]
//! trait, suitable for testing, development, or embedded deployments where the
//! whole identity database fits in memory and is snapshotted to a JSON file.

mod persistence;
mod session;

use std::{
    any::Any,
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{
    Result,
    backend::{Document, DocumentBackend, DocumentSession, errors::BackendError},
    config::StoreOptions,
};

use session::InMemorySession;

/// database name -> document ID -> document
pub(crate) type DatabaseMap = HashMap<String, HashMap<String, Document>>;

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// `load` and `load_many`
    Load,
    /// `query`
    Query,
    /// `commit` of a session that has buffered writes
    Commit,
}

/// What an injected fault does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// Fail with [`BackendError::Unavailable`].
    Unavailable,
    /// Fail with [`BackendError::Rejected`] carrying `code`.
    Rejected { code: String },
    /// Report a successful commit but discard the buffered writes.
    ///
    /// Only meaningful at [`FaultPoint::Commit`].
    DropWrites,
}

#[derive(Debug)]
struct InjectedFault {
    point: FaultPoint,
    kind: FaultKind,
    remaining: usize,
}

/// Session and commit counters, for asserting session discipline in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Sessions opened since the store was created.
    pub sessions_opened: u64,
    /// Sessions opened but not yet closed.
    pub sessions_open: u64,
    /// Commits that were applied (or reported as applied).
    pub commits: u64,
}

/// Shared state behind every handle and session of one store.
#[derive(Debug, Default)]
pub(crate) struct InMemoryState {
    pub(crate) databases: RwLock<DatabaseMap>,
    faults: Mutex<Vec<InjectedFault>>,
    sessions_opened: AtomicU64,
    sessions_open: AtomicU64,
    commits: AtomicU64,
    /// Snapshot target written after each commit, if any
    snapshot_path: Option<PathBuf>,
    /// Serializes writes to snapshot files
    snapshot_lock: Mutex<()>,
}

impl InMemoryState {
    /// Consume one injected fault registered for `point`, if any.
    pub(crate) async fn take_fault(&self, point: FaultPoint) -> Option<FaultKind> {
        let mut faults = self.faults.lock().await;
        let index = faults
            .iter()
            .position(|f| f.point == point && f.remaining > 0)?;
        let kind = faults[index].kind.clone();
        faults[index].remaining -= 1;
        if faults[index].remaining == 0 {
            faults.remove(index);
        }
        Some(kind)
    }

    pub(crate) fn release_session(&self) {
        self.sessions_open.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::SeqCst);
    }

    /// Runs `apply` against the committed databases under the write lock.
    ///
    /// With a snapshot file, `apply` runs on a copy that is written out first
    /// and only replaces the shared map once the write succeeded. A failed
    /// snapshot leaves every database as it was.
    pub(crate) async fn apply_commit<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DatabaseMap) + Send,
    {
        let mut databases = self.databases.write().await;
        let Some(path) = &self.snapshot_path else {
            apply(&mut databases);
            return Ok(());
        };
        let mut next = databases.clone();
        apply(&mut next);
        let _guard = self.snapshot_lock.lock().await;
        persistence::write_snapshot(&next, path).await?;
        *databases = next;
        Ok(())
    }
}

/// A document store held entirely in memory.
///
/// Databases are keyed by name; inside a database every document is keyed by
/// its ID. Commits apply a session's buffered writes under a single write lock,
/// so each commit is atomic with respect to other sessions.
///
/// The store can be saved to and loaded from a JSON snapshot. When opened via
/// [`InMemory::open`] with a `data_file` and `persist_on_commit`, the snapshot
/// is rewritten after every commit.
///
/// For tests, [`inject_fault`](InMemory::inject_fault) makes upcoming
/// operations fail and [`stats`](InMemory::stats) reports session counters.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    pub(crate) state: Arc<InMemoryState>,
}

impl InMemory {
    /// Creates a new, empty store with no snapshot file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store as described by `options`.
    ///
    /// If `options.data_file` is set its snapshot is loaded (a missing file
    /// yields an empty store), and with `persist_on_commit` every commit
    /// rewrites it.
    pub async fn open(options: &StoreOptions) -> Result<Self> {
        let Some(path) = &options.data_file else {
            return Ok(Self::new());
        };
        let databases = persistence::read_snapshot(path).await?;
        let snapshot_path = options.persist_on_commit.then(|| path.clone());
        tracing::debug!(
            path = %path.display(),
            persist_on_commit = options.persist_on_commit,
            "Opened in-memory document store from snapshot"
        );
        Ok(Self::from_parts(databases, snapshot_path))
    }

    pub(crate) fn from_parts(databases: DatabaseMap, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            state: Arc::new(InMemoryState {
                databases: RwLock::new(databases),
                snapshot_path,
                ..Default::default()
            }),
        }
    }

    /// Saves every database to `path` as JSON.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let databases = self.state.databases.read().await.clone();
        let _guard = self.state.snapshot_lock.lock().await;
        persistence::write_snapshot(&databases, path).await
    }

    /// Loads a store from a JSON snapshot.
    ///
    /// If the file does not exist, a new, empty store is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let databases = persistence::read_snapshot(path).await?;
        Ok(Self::from_parts(databases, None))
    }

    /// Number of committed documents in `database`.
    pub async fn document_count(&self, database: &str) -> usize {
        self.state
            .databases
            .read()
            .await
            .get(database)
            .map_or(0, HashMap::len)
    }

    /// Makes the next `times` operations at `point` behave as `kind`.
    pub async fn inject_fault(&self, point: FaultPoint, kind: FaultKind, times: usize) {
        if times == 0 {
            return;
        }
        self.state.faults.lock().await.push(InjectedFault {
            point,
            kind,
            remaining: times,
        });
    }

    /// Makes the next `times` commits report success without applying anything.
    pub async fn drop_writes(&self, times: usize) {
        self.inject_fault(FaultPoint::Commit, FaultKind::DropWrites, times)
            .await;
    }

    /// Removes every pending injected fault.
    pub async fn clear_faults(&self) {
        self.state.faults.lock().await.clear();
    }

    /// Current session and commit counters.
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            sessions_opened: self.state.sessions_opened.load(Ordering::SeqCst),
            sessions_open: self.state.sessions_open.load(Ordering::SeqCst),
            commits: self.state.commits.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl DocumentBackend for InMemory {
    async fn open_session(&self, database: &str) -> Result<Box<dyn DocumentSession>> {
        if database.is_empty() {
            return Err(BackendError::Unavailable {
                operation: "open_session".to_string(),
                reason: "database name is empty".to_string(),
            }
            .into());
        }
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.state.sessions_open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession::new(
            Arc::clone(&self.state),
            database.to_string(),
        )))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
