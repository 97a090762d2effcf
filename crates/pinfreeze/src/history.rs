// ABOUTME: Snapshot history for pinned content: create a snapshot, then keep only the newest N per parent.
// ABOUTME: Storage sits behind the SnapshotStore trait; MemorySnapshotStore is the in-process implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshots kept per parent when no limit is configured.
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 10;

/// Errors raised by snapshot bookkeeping.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The parent content id is not usable (zero).
    #[error("could not create snapshot: invalid parent id {0}")]
    InvalidParent(u64),

    /// The backing store refused the operation.
    #[error("snapshot store error: {0}")]
    Store(String),
}

/// A persisted copy of previously pinned HTML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: u64,
    pub parent_id: u64,
    pub title: String,
    pub html: String,
    pub author_id: u64,
    pub created_at: DateTime<Utc>,
}

/// Snapshot data before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub parent_id: u64,
    pub title: String,
    pub html: String,
    pub author_id: u64,
    pub created_at: DateTime<Utc>,
}

/// Content-record storage for snapshots.
pub trait SnapshotStore {
    fn insert(&mut self, snapshot: NewSnapshot) -> Result<Snapshot, HistoryError>;

    /// Snapshots of `parent_id`, newest first.
    fn list(&self, parent_id: u64) -> Vec<Snapshot>;

    fn delete(&mut self, id: u64) -> Result<(), HistoryError>;
}

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    next_id: u64,
    snapshots: Vec<Snapshot>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn insert(&mut self, snapshot: NewSnapshot) -> Result<Snapshot, HistoryError> {
        self.next_id += 1;
        let stored = Snapshot {
            id: self.next_id,
            parent_id: snapshot.parent_id,
            title: snapshot.title,
            html: snapshot.html,
            author_id: snapshot.author_id,
            created_at: snapshot.created_at,
        };
        self.snapshots.push(stored.clone());
        Ok(stored)
    }

    fn list(&self, parent_id: u64) -> Vec<Snapshot> {
        let mut out: Vec<Snapshot> = self
            .snapshots
            .iter()
            .filter(|s| s.parent_id == parent_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }

    fn delete(&mut self, id: u64) -> Result<(), HistoryError> {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.id != id);
        if self.snapshots.len() == before {
            return Err(HistoryError::Store(format!("snapshot {} not found", id)));
        }
        Ok(())
    }
}

/// Snapshot history with rotation.
#[derive(Debug)]
pub struct History<S> {
    store: S,
    limit: usize,
}

impl<S: SnapshotStore> History<S> {
    /// A limit below 1 falls back to [`DEFAULT_SNAPSHOT_LIMIT`].
    pub fn new(store: S, limit: usize) -> Self {
        let limit = if limit < 1 { DEFAULT_SNAPSHOT_LIMIT } else { limit };
        Self { store, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store a snapshot of `html` for `parent_id`, then rotate that parent's history.
    pub fn create_snapshot(
        &mut self,
        parent_id: u64,
        parent_title: &str,
        html: &str,
        author_id: u64,
    ) -> Result<Snapshot, HistoryError> {
        if parent_id == 0 {
            return Err(HistoryError::InvalidParent(parent_id));
        }

        let now = Utc::now();
        let snapshot = self.store.insert(NewSnapshot {
            parent_id,
            title: format!(
                "Snapshot of {} - {}",
                parent_title,
                now.format("%Y-%m-%d %H:%M:%S")
            ),
            html: html.to_string(),
            author_id,
            created_at: now,
        })?;

        let removed = self.rotate(parent_id)?;
        tracing::debug!(
            parent_id,
            snapshot_id = snapshot.id,
            removed,
            "snapshot created"
        );
        Ok(snapshot)
    }

    /// Delete all but the newest `limit` snapshots of `parent_id`. Returns how many were removed.
    pub fn rotate(&mut self, parent_id: u64) -> Result<usize, HistoryError> {
        if parent_id == 0 {
            return Ok(0);
        }

        let snapshots = self.store.list(parent_id);
        if snapshots.len() <= self.limit {
            return Ok(0);
        }

        let stale: Vec<u64> = snapshots[self.limit..].iter().map(|s| s.id).collect();
        for id in &stale {
            self.store.delete(*id)?;
        }
        Ok(stale.len())
    }

    /// Snapshots of `parent_id`, newest first.
    pub fn snapshots(&self, parent_id: u64) -> Vec<Snapshot> {
        self.store.list(parent_id)
    }
}
