//! JSON-file snapshot persistence.
//!
//! One file per (source, item-kind) partition under the configured state
//! directory, e.g. `google_tasks.json`. The whole partition is held in
//! memory and written through on every mutation, atomically via a temp file
//! and rename. Partitions are small (a user's task lists), so rewriting the
//! file per mutation is well inside poll-interval budgets.

use async_trait::async_trait;
use mirror_core::{Result as CoreResult, Snapshot, SnapshotStore, SourceKind, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// On-disk shape of one partition.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PartitionFile {
    snapshots: Vec<Snapshot>,
}

/// File-backed snapshot partition for one source kind.
pub struct JsonSnapshotStore {
    path: PathBuf,
    rows: Mutex<HashMap<String, Snapshot>>,
}

impl JsonSnapshotStore {
    /// Open (or create) the partition for a source kind.
    pub fn open(state_dir: &Path, kind: SourceKind) -> anyhow::Result<Self> {
        fs::create_dir_all(state_dir)?;
        let path = state_dir.join(format!("{kind}.json"));

        let rows = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: PartitionFile = serde_json::from_str(&contents)?;
            file.snapshots
                .into_iter()
                .map(|s| (s.native_id.clone(), s))
                .collect()
        } else {
            HashMap::new()
        };

        debug!(partition = %kind, rows = rows.len(), "opened snapshot partition");
        Ok(Self { path, rows: Mutex::new(rows) })
    }

    /// Write the partition to disk: temp file then rename, so a crash never
    /// leaves a torn file behind.
    fn persist(&self, rows: &HashMap<String, Snapshot>) -> CoreResult<()> {
        let mut snapshots: Vec<Snapshot> = rows.values().cloned().collect();
        snapshots.sort_by(|a, b| a.native_id.cmp(&b.native_id));
        let file = PartitionFile { snapshots };

        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| SyncError::Store(e.to_string()))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents).map_err(|e| SyncError::Store(e.to_string()))?;
        fs::rename(&temp_path, &self.path).map_err(|e| SyncError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn get(&self, native_id: &str) -> CoreResult<Option<Snapshot>> {
        Ok(self.rows.lock().unwrap().get(native_id).cloned())
    }

    async fn get_by_mirror_id(&self, mirror_id: &str) -> CoreResult<Option<Snapshot>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|s| s.mirror_id.as_deref() == Some(mirror_id))
            .cloned())
    }

    async fn all(&self) -> CoreResult<Vec<Snapshot>> {
        let mut rows: Vec<Snapshot> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.native_id.cmp(&b.native_id));
        Ok(rows)
    }

    async fn all_mirrored(&self) -> CoreResult<Vec<Snapshot>> {
        let mut rows: Vec<Snapshot> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.mirror_id.is_some())
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.native_id.cmp(&b.native_id));
        Ok(rows)
    }

    async fn insert(&self, snapshot: Snapshot) -> CoreResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(snapshot.native_id.clone(), snapshot);
        self.persist(&rows)
    }

    async fn update(&self, snapshot: Snapshot) -> CoreResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(snapshot.native_id.clone(), snapshot);
        self.persist(&rows)
    }

    async fn delete(&self, native_id: &str) -> CoreResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.remove(native_id).is_some() {
            self.persist(&rows)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::{ItemStatus, SourceItem};
    use tempfile::TempDir;

    fn snapshot(native_id: &str, mirror_id: Option<&str>) -> Snapshot {
        let item = SourceItem {
            id: native_id.into(),
            list_id: "list".into(),
            parent_id: None,
            title: "Buy milk".into(),
            notes: Some("2%".into()),
            status: ItemStatus::Open,
            due: Some("2024-01-15".into()),
            modified_at: None,
            assigned_to: None,
        };
        Snapshot::from_item(&item, mirror_id.map(String::from), &["grocery".to_string()])
    }

    #[tokio::test]
    async fn test_round_trip_across_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let store = JsonSnapshotStore::open(dir.path(), SourceKind::GoogleTasks).unwrap();
            store.insert(snapshot("g1", Some("m1"))).await.unwrap();
            store.insert(snapshot("g2", None)).await.unwrap();
        }

        let store = JsonSnapshotStore::open(dir.path(), SourceKind::GoogleTasks).unwrap();
        let loaded = store.get("g1").await.unwrap().unwrap();
        assert_eq!(loaded.mirror_id.as_deref(), Some("m1"));
        assert_eq!(loaded.applied_tags, vec!["grocery".to_string()]);
        assert_eq!(store.all().await.unwrap().len(), 2);
        assert_eq!(store.all_mirrored().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partitions_are_separate_files() {
        let dir = TempDir::new().unwrap();

        let google = JsonSnapshotStore::open(dir.path(), SourceKind::GoogleTasks).unwrap();
        let alexa = JsonSnapshotStore::open(dir.path(), SourceKind::AlexaShopping).unwrap();
        google.insert(snapshot("g1", None)).await.unwrap();
        alexa.insert(snapshot("a1", None)).await.unwrap();

        assert!(dir.path().join("google_tasks.json").exists());
        assert!(dir.path().join("alexa_shopping.json").exists());
        assert!(google.get("a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = JsonSnapshotStore::open(dir.path(), SourceKind::GoogleTasks).unwrap();

        store.insert(snapshot("g1", None)).await.unwrap();
        store.delete("g1").await.unwrap();
        store.delete("g1").await.unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_by_mirror_id() {
        let dir = TempDir::new().unwrap();
        let store = JsonSnapshotStore::open(dir.path(), SourceKind::MicrosoftTodo).unwrap();

        store.insert(snapshot("ms1", Some("task-9"))).await.unwrap();
        let found = store.get_by_mirror_id("task-9").await.unwrap().unwrap();
        assert_eq!(found.native_id, "ms1");
        assert!(store.get_by_mirror_id("task-0").await.unwrap().is_none());
    }
}
