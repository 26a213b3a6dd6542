//! End-to-end tests for mirror-daemon.
//!
//! Drives full polling passes through the scheduler with in-memory
//! platform fakes and real JSON-file snapshot persistence, including
//! daemon restarts (reopening the snapshot partition from disk).

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mirror_core::memory::{MemoryMirror, MemoryRemote};
use mirror_core::{ContainerRef, ItemStatus, ScopeMapping, SourceItem, SourceKind};
use mirror_daemon::config::Config;
use mirror_daemon::health::DaemonHealth;
use mirror_daemon::scheduler::SourceRunner;
use mirror_daemon::store::JsonSnapshotStore;
use tempfile::TempDir;

fn item(id: &str, title: &str) -> SourceItem {
    SourceItem {
        id: id.into(),
        list_id: "list-1".into(),
        parent_id: None,
        title: title.into(),
        notes: None,
        status: ItemStatus::Open,
        due: None,
        modified_at: None,
        assigned_to: None,
    }
}

/// Build a runner with a freshly opened snapshot partition, as a daemon
/// restart would.
fn runner(
    kind: SourceKind,
    state_dir: &Path,
    source: &Arc<MemoryRemote>,
    mirror: &Arc<MemoryMirror>,
    scope: ScopeMapping,
    health: &Arc<Mutex<DaemonHealth>>,
) -> SourceRunner {
    let store = JsonSnapshotStore::open(state_dir, kind).unwrap();
    SourceRunner::new(
        kind,
        Duration::from_secs(60),
        source.clone(),
        mirror.clone(),
        Arc::new(store),
        vec![scope],
        health.clone(),
    )
}

#[tokio::test]
async fn test_one_way_mirror_survives_restart() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryRemote::new());
    let mirror = Arc::new(MemoryMirror::new());
    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    let scope = ScopeMapping::new("list-1", ContainerRef::Inbox);

    source.seed(vec![item("n1", "Buy milk"), item("n2", "Call dentist")]);
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope.clone(), &health)
        .run_pass()
        .await;

    assert_eq!(mirror.task_count(), 2);
    assert!(dir.path().join("google_tasks.json").exists());

    // Restart: a fresh store loads the partition from disk, and an
    // unchanged remote produces no new writes.
    mirror.reset_calls();
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope, &health)
        .run_pass()
        .await;

    let calls = mirror.calls();
    assert!(calls.creates.is_empty());
    assert!(calls.updates.is_empty());
    assert_eq!(mirror.task_count(), 2);
    assert_eq!(health.lock().unwrap().passes_completed, 2);
}

#[tokio::test]
async fn test_remote_edit_propagates_after_restart() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryRemote::new());
    let mirror = Arc::new(MemoryMirror::new());
    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    let scope = ScopeMapping::new("list-1", ContainerRef::Inbox);

    source.seed(vec![item("n1", "Buy milk")]);
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope.clone(), &health)
        .run_pass()
        .await;
    assert_eq!(mirror.calls().creates.len(), 1);

    source.seed(vec![item("n1", "Buy oat milk")]);
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope, &health)
        .run_pass()
        .await;

    assert_eq!(mirror.task("task-1").unwrap().content, "Buy oat milk");
    assert_eq!(mirror.task_count(), 1);
}

#[tokio::test]
async fn test_remote_deletion_removes_mirrored_task() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryRemote::new());
    let mirror = Arc::new(MemoryMirror::new());
    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    let scope = ScopeMapping::new("list-1", ContainerRef::Inbox);

    source.seed(vec![item("n1", "Ephemeral"), item("n2", "Stays")]);
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope.clone(), &health)
        .run_pass()
        .await;
    assert_eq!(mirror.task_count(), 2);

    source.seed(vec![item("n2", "Stays")]);
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope, &health)
        .run_pass()
        .await;

    assert_eq!(mirror.task_count(), 1);
    let store = JsonSnapshotStore::open(dir.path(), SourceKind::GoogleTasks).unwrap();
    use mirror_core::SnapshotStore;
    assert!(store.get("n1").await.unwrap().is_none());
    assert!(store.get("n2").await.unwrap().is_some());
}

#[tokio::test]
async fn test_human_deleted_mirror_task_is_recreated() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryRemote::new());
    let mirror = Arc::new(MemoryMirror::new());
    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    let scope = ScopeMapping::new("list-1", ContainerRef::Inbox);

    source.seed(vec![item("n1", "Persistent")]);
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope.clone(), &health)
        .run_pass()
        .await;
    assert_eq!(mirror.task_count(), 1);

    // Someone deletes the mirrored task in the app. The sweep drops the
    // stale snapshot row and the next pass mirrors the item again.
    mirror.remove_task("task-1");
    runner(SourceKind::GoogleTasks, dir.path(), &source, &mirror, scope, &health)
        .run_pass()
        .await;

    assert_eq!(mirror.task_count(), 1);
    assert_eq!(mirror.calls().creates.len(), 2);
}

#[tokio::test]
async fn test_two_mappings_on_one_source_stay_isolated() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryRemote::new());
    let mirror = Arc::new(MemoryMirror::new());
    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    mirror.add_container("work", "proj-work");

    let mut a = item("n-a", "From list A");
    a.list_id = "list-a".into();
    let mut b = item("n-b", "From list B");
    b.list_id = "list-b".into();
    source.seed(vec![a, b]);

    // One snapshot partition for the whole source, shared by both
    // mappings, each landing in a different container.
    let store = Arc::new(JsonSnapshotStore::open(dir.path(), SourceKind::GoogleTasks).unwrap());
    let runner = SourceRunner::new(
        SourceKind::GoogleTasks,
        Duration::from_secs(60),
        source.clone(),
        mirror.clone(),
        store.clone(),
        vec![
            ScopeMapping::new("list-a", ContainerRef::Inbox),
            ScopeMapping::new("list-b", ContainerRef::Named("work".into())),
        ],
        health.clone(),
    );

    runner.run_pass().await;
    assert_eq!(mirror.task_count(), 2);

    // A second pass must not read one list's rows as the other list's
    // deletions, nor sweep them for living in the other container.
    mirror.reset_calls();
    runner.run_pass().await;

    let calls = mirror.calls();
    assert!(calls.creates.is_empty());
    assert!(calls.deletes.is_empty());
    assert_eq!(mirror.task_count(), 2);
    use mirror_core::SnapshotStore;
    assert!(store.get("n-a").await.unwrap().is_some());
    assert!(store.get("n-b").await.unwrap().is_some());
}

#[tokio::test]
async fn test_bidirectional_write_back_converges() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryRemote::with_user("Alice"));
    let mirror = Arc::new(MemoryMirror::new());
    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    let scope = ScopeMapping::new("list-1", ContainerRef::Inbox);

    source.seed(vec![item("n1", "Draft report")]);
    runner(SourceKind::MicrosoftTodo, dir.path(), &source, &mirror, scope.clone(), &health)
        .run_pass()
        .await;
    assert_eq!(mirror.task_count(), 1);

    // Someone renames the mirrored task; the edit flows back to the
    // native platform on the next pass.
    let mut task = mirror.task("task-1").unwrap();
    task.content = "Draft Q4 report".to_string();
    mirror.seed_task(MemoryMirror::INBOX_ID, task);

    runner(SourceKind::MicrosoftTodo, dir.path(), &source, &mirror, scope.clone(), &health)
        .run_pass()
        .await;

    let updates = source.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1.title, "Draft Q4 report");

    // A third pass settles: both sides agree, nothing else is written.
    runner(SourceKind::MicrosoftTodo, dir.path(), &source, &mirror, scope, &health)
        .run_pass()
        .await;
    assert_eq!(source.updates().len(), 1);
}

#[tokio::test]
async fn test_mirror_created_task_is_adopted_into_source() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(MemoryRemote::with_user("Alice"));
    let mirror = Arc::new(MemoryMirror::new());
    let health = Arc::new(Mutex::new(DaemonHealth::new()));
    let scope = ScopeMapping::new("list-1", ContainerRef::Inbox);

    mirror.seed_task(
        MemoryMirror::INBOX_ID,
        mirror_core::MirrorTask {
            id: "task-app".into(),
            content: "Book flights".into(),
            description: None,
            due: None,
            completed: false,
            labels: vec![],
            parent_id: None,
        },
    );

    runner(SourceKind::MicrosoftTodo, dir.path(), &source, &mirror, scope.clone(), &health)
        .run_pass()
        .await;

    let creates = source.creates();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].title, "Book flights");

    // Adopted once, not again after a restart.
    runner(SourceKind::MicrosoftTodo, dir.path(), &source, &mirror, scope, &health)
        .run_pass()
        .await;
    assert_eq!(source.creates().len(), 1);
}

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mirror.yaml");
    std::fs::write(
        &path,
        r#"
state_dir: /var/lib/taskmirror
mirror:
  base_url: https://api.todoist.com/rest/v2
  token_env: TODOIST_TOKEN
sources:
  - kind: alexa_shopping
    poll_interval_secs: 600
    token_env: ALEXA_TOKEN
    mappings:
      - list: shopping-list-id
        container: inbox
        delete_after_sync: true
        tags: [shopping]
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.sources[0].kind, SourceKind::AlexaShopping);
    let scope = config.sources[0].mappings[0].to_scope();
    assert!(scope.delete_after_sync);
    assert_eq!(scope.tags, vec!["shopping".to_string()]);
}
