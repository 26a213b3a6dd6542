//! Snapshot records: the locally persisted last-known state of each native
//! item, used as the diff baseline on every poll cycle.
//!
//! One store instance covers one (source, item-kind) partition. Native IDs
//! are unique within a partition and never reused.

use crate::error::Result;
use crate::item::{ItemStatus, MirrorTask, SourceItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known remote modification marker.
///
/// Platforms that expose real modification timestamps store one; platforms
/// that do not get a content hash instead, and change detection falls back
/// to field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMarker {
    Timestamp(DateTime<Utc>),
    Hash(String),
}

impl ChangeMarker {
    /// The timestamp, if this marker is one.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ChangeMarker::Timestamp(ts) => Some(*ts),
            ChangeMarker::Hash(_) => None,
        }
    }
}

/// Persisted last-known state of one native item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Platform-assigned ID. Primary reconciliation key.
    pub native_id: String,
    /// ID of the mirrored counterpart, once one exists. Re-verified every
    /// cycle; the mirrored service is not authoritative here.
    pub mirror_id: Option<String>,
    /// Native list/category the item was fetched from.
    pub list_id: String,
    /// Native parent ID for single-level subtasks.
    pub parent_native_id: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub status: ItemStatus,
    pub due: Option<String>,
    /// Last-known remote modification marker.
    pub remote_marker: Option<ChangeMarker>,
    /// Timestamp of the last mirrored-side write performed by this daemon.
    /// Present only for bi-directional sources.
    pub mirror_marker: Option<DateTime<Utc>>,
    /// Exactly the configured tag set at last write, never merged with
    /// user-added mirrored-side labels.
    pub applied_tags: Vec<String>,
    /// Bookkeeping timestamp of the last snapshot write.
    pub synced_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from a freshly mirrored remote item.
    pub fn from_item(item: &SourceItem, mirror_id: Option<String>, tags: &[String]) -> Self {
        Self {
            native_id: item.id.clone(),
            mirror_id,
            list_id: item.list_id.clone(),
            parent_native_id: item.parent_id.clone(),
            title: item.title.clone(),
            notes: item.notes.clone(),
            status: item.status,
            due: item.due.clone(),
            remote_marker: item.modified_at.map(ChangeMarker::Timestamp),
            mirror_marker: None,
            applied_tags: tags.to_vec(),
            synced_at: Utc::now(),
        }
    }

    /// Overwrite content fields and the remote marker from current remote state.
    pub fn absorb_item(&mut self, item: &SourceItem) {
        self.title = item.title.clone();
        self.notes = item.notes.clone();
        self.status = item.status;
        self.due = item.due.clone();
        self.parent_native_id = item.parent_id.clone();
        self.remote_marker = item.modified_at.map(ChangeMarker::Timestamp);
        self.synced_at = Utc::now();
    }

    /// Overwrite content fields from current mirrored-side state (the mirror
    /// won a conflict, or a mirrored edit is being pushed to the source).
    pub fn absorb_task(&mut self, task: &MirrorTask) {
        self.title = task.content.clone();
        self.notes = task.description.clone();
        self.status = ItemStatus::from_completed(task.completed);
        self.due = task.due.clone();
        self.synced_at = Utc::now();
    }

    /// Record a write we just performed against the mirrored service.
    pub fn touch_mirror_marker(&mut self) {
        self.mirror_marker = Some(Utc::now());
        self.synced_at = Utc::now();
    }
}

/// CRUD over one snapshot partition.
///
/// Implementations: `MemorySnapshotStore` (in-crate, for tests) and the
/// daemon's JSON-file store.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Look up by native ID.
    async fn get(&self, native_id: &str) -> Result<Option<Snapshot>>;

    /// Look up by mirrored-service ID.
    async fn get_by_mirror_id(&self, mirror_id: &str) -> Result<Option<Snapshot>>;

    /// All rows in this partition.
    async fn all(&self) -> Result<Vec<Snapshot>>;

    /// All rows that have a mirrored counterpart recorded.
    async fn all_mirrored(&self) -> Result<Vec<Snapshot>>;

    /// Insert a new row. Replaces any existing row with the same native ID.
    async fn insert(&self, snapshot: Snapshot) -> Result<()>;

    /// Update an existing row.
    async fn update(&self, snapshot: Snapshot) -> Result<()>;

    /// Remove a row. Removing a missing row is not an error.
    async fn delete(&self, native_id: &str) -> Result<()>;
}
