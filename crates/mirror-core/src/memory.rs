//! In-memory collaborator implementations for testing.
//!
//! These back the engine's own test suites and the daemon's integration
//! tests. They record every write call so tests can assert on exactly which
//! operations a pass issued.

use crate::clients::{ContainerRef, MirrorService, RemoteSource};
use crate::error::{Result, SyncError};
use crate::item::{MirrorFields, MirrorTask, SourceFields, SourceItem};
use crate::snapshot::{Snapshot, SnapshotStore};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// In-memory native platform.
#[derive(Default)]
pub struct MemoryRemote {
    items: Mutex<Vec<SourceItem>>,
    user: Option<String>,
    next_id: AtomicU64,
    deletes: Mutex<Vec<String>>,
    creates: Mutex<Vec<SourceFields>>,
    updates: Mutex<Vec<(String, SourceFields)>>,
    completions: Mutex<Vec<(String, bool)>>,
    fail_deletes: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: impl Into<String>) -> Self {
        Self { user: Some(user.into()), ..Self::default() }
    }

    /// Seed the remote item set.
    pub fn seed(&self, items: Vec<SourceItem>) {
        *self.items.lock().unwrap() = items;
    }

    /// Make `delete_item` fail, for partial-failure tests.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<SourceFields> {
        self.creates.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, SourceFields)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn completions(&self) -> Vec<(String, bool)> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSource for MemoryRemote {
    async fn list_items(&self, list_id: &str, include_completed: bool) -> Result<Vec<SourceItem>> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .filter(|i| i.list_id == list_id)
            .filter(|i| include_completed || !i.status.is_completed())
            .cloned()
            .collect())
    }

    async fn create_item(&self, list_id: &str, fields: &SourceFields) -> Result<String> {
        let id = format!("native-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.creates.lock().unwrap().push(fields.clone());
        self.items.lock().unwrap().push(SourceItem {
            id: id.clone(),
            list_id: list_id.to_string(),
            parent_id: None,
            title: fields.title.clone(),
            notes: fields.notes.clone(),
            status: crate::item::ItemStatus::Open,
            due: fields.due.clone(),
            modified_at: None,
            assigned_to: None,
        });
        Ok(id)
    }

    async fn update_item(&self, _list_id: &str, id: &str, fields: &SourceFields) -> Result<()> {
        self.updates.lock().unwrap().push((id.to_string(), fields.clone()));
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            item.title = fields.title.clone();
            item.notes = fields.notes.clone();
            item.due = fields.due.clone();
        }
        Ok(())
    }

    async fn set_completion(&self, _list_id: &str, id: &str, completed: bool) -> Result<()> {
        self.completions.lock().unwrap().push((id.to_string(), completed));
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            item.status = crate::item::ItemStatus::from_completed(completed);
        }
        Ok(())
    }

    async fn delete_item(&self, _list_id: &str, id: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(SyncError::Source(format!("delete {id} failed")));
        }
        self.deletes.lock().unwrap().push(id.to_string());
        self.items.lock().unwrap().retain(|i| i.id != id);
        Ok(())
    }

    fn authenticated_user(&self) -> Option<String> {
        self.user.clone()
    }
}

/// Record of every write issued against a [`MemoryMirror`].
#[derive(Debug, Default, Clone)]
pub struct MirrorCalls {
    pub creates: Vec<MirrorFields>,
    pub updates: Vec<(String, MirrorFields)>,
    pub label_sets: Vec<(String, Vec<String>)>,
    pub completions: Vec<(String, bool)>,
    pub deletes: Vec<String>,
}

/// In-memory mirrored service.
pub struct MemoryMirror {
    tasks: Mutex<HashMap<String, MirrorTask>>,
    /// Task ID -> container ID.
    placement: Mutex<HashMap<String, String>>,
    /// Container name -> container ID, for `ContainerRef::Named`.
    containers: Mutex<HashMap<String, String>>,
    next_id: AtomicU64,
    calls: Mutex<MirrorCalls>,
    fail_next_create: AtomicBool,
    fail_next_completion: AtomicBool,
}

impl MemoryMirror {
    pub const INBOX_ID: &'static str = "inbox";

    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            placement: Mutex::new(HashMap::new()),
            containers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            calls: Mutex::new(MirrorCalls::default()),
            fail_next_create: AtomicBool::new(false),
            fail_next_completion: AtomicBool::new(false),
        }
    }

    /// Register a named container.
    pub fn add_container(&self, name: &str, id: &str) {
        self.containers.lock().unwrap().insert(name.to_string(), id.to_string());
    }

    /// Seed a task directly, bypassing the call log.
    pub fn seed_task(&self, container_id: &str, task: MirrorTask) {
        self.placement.lock().unwrap().insert(task.id.clone(), container_id.to_string());
        self.tasks.lock().unwrap().insert(task.id.clone(), task);
    }

    /// Remove a task directly (simulates a human deleting it in the app).
    pub fn remove_task(&self, id: &str) {
        self.tasks.lock().unwrap().remove(id);
        self.placement.lock().unwrap().remove(id);
    }

    pub fn task(&self, id: &str) -> Option<MirrorTask> {
        self.tasks.lock().unwrap().get(id).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn calls(&self) -> MirrorCalls {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        *self.calls.lock().unwrap() = MirrorCalls::default();
    }

    /// Make the next `create_task` call fail, for partial-failure tests.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    /// Make the next `set_completion` call fail, for partial-failure tests.
    pub fn fail_next_completion(&self) {
        self.fail_next_completion.store(true, Ordering::SeqCst);
    }
}

impl Default for MemoryMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MirrorService for MemoryMirror {
    async fn resolve_container_id(&self, container: &ContainerRef) -> Result<String> {
        match container {
            ContainerRef::Inbox => Ok(Self::INBOX_ID.to_string()),
            ContainerRef::Named(name) => self
                .containers
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| SyncError::Scope(format!("no container named {name}"))),
        }
    }

    async fn list_items(&self, container_id: &str) -> Result<Vec<MirrorTask>> {
        let placement = self.placement.lock().unwrap();
        let tasks = self.tasks.lock().unwrap();
        let mut out: Vec<MirrorTask> = tasks
            .values()
            .filter(|t| placement.get(&t.id).map(String::as_str) == Some(container_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn list_item_ids(&self, container_id: &str) -> Result<HashSet<String>> {
        let placement = self.placement.lock().unwrap();
        Ok(placement
            .iter()
            .filter(|(_, c)| c.as_str() == container_id)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn create_task(&self, fields: &MirrorFields) -> Result<String> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(SyncError::Mirror("create failed".into()));
        }
        let id = format!("task-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().unwrap().creates.push(fields.clone());
        let container = fields.container_id.clone().unwrap_or_else(|| Self::INBOX_ID.to_string());
        self.placement.lock().unwrap().insert(id.clone(), container);
        self.tasks.lock().unwrap().insert(
            id.clone(),
            MirrorTask {
                id: id.clone(),
                content: fields.content.clone(),
                description: fields.description.clone(),
                due: fields.due.clone(),
                completed: false,
                labels: fields.labels.clone(),
                parent_id: fields.parent_id.clone(),
            },
        );
        Ok(id)
    }

    async fn update_task(&self, id: &str, fields: &MirrorFields) -> Result<()> {
        self.calls.lock().unwrap().updates.push((id.to_string(), fields.clone()));
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| SyncError::Mirror(format!("no task {id}")))?;
        task.content = fields.content.clone();
        task.description = fields.description.clone();
        task.due = fields.due.clone();
        Ok(())
    }

    async fn set_labels(&self, id: &str, labels: &[String]) -> Result<()> {
        self.calls.lock().unwrap().label_sets.push((id.to_string(), labels.to_vec()));
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| SyncError::Mirror(format!("no task {id}")))?;
        task.labels = labels.to_vec();
        Ok(())
    }

    async fn set_completion(&self, id: &str, completed: bool) -> Result<()> {
        if self.fail_next_completion.swap(false, Ordering::SeqCst) {
            return Err(SyncError::Mirror(format!("set_completion {id} failed")));
        }
        self.calls.lock().unwrap().completions.push((id.to_string(), completed));
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| SyncError::Mirror(format!("no task {id}")))?;
        task.completed = completed;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        self.calls.lock().unwrap().deletes.push(id.to_string());
        let removed = self.tasks.lock().unwrap().remove(id);
        self.placement.lock().unwrap().remove(id);
        if removed.is_none() {
            return Err(SyncError::Mirror(format!("no task {id}")));
        }
        Ok(())
    }
}

/// In-memory snapshot partition.
#[derive(Default)]
pub struct MemorySnapshotStore {
    rows: Mutex<HashMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, native_id: &str) -> Result<Option<Snapshot>> {
        Ok(self.rows.lock().unwrap().get(native_id).cloned())
    }

    async fn get_by_mirror_id(&self, mirror_id: &str) -> Result<Option<Snapshot>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|s| s.mirror_id.as_deref() == Some(mirror_id))
            .cloned())
    }

    async fn all(&self) -> Result<Vec<Snapshot>> {
        let mut rows: Vec<Snapshot> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.native_id.cmp(&b.native_id));
        Ok(rows)
    }

    async fn all_mirrored(&self) -> Result<Vec<Snapshot>> {
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

    async fn insert(&self, snapshot: Snapshot) -> Result<()> {
        self.rows.lock().unwrap().insert(snapshot.native_id.clone(), snapshot);
        Ok(())
    }

    async fn update(&self, snapshot: Snapshot) -> Result<()> {
        self.rows.lock().unwrap().insert(snapshot.native_id.clone(), snapshot);
        Ok(())
    }

    async fn delete(&self, native_id: &str) -> Result<()> {
        self.rows.lock().unwrap().remove(native_id);
        Ok(())
    }
}
