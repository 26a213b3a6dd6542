//! Per-source polling loops.
//!
//! Each configured source gets its own task with its own interval; a slow
//! Microsoft pass never delays a Google pass. Within one source, passes
//! never overlap: ticks that fire while a pass is still running are
//! delayed, not stacked.

use crate::health::DaemonHealth;
use mirror_core::{
    sweep_stale, BidirReconciler, MirrorService, OneWayReconciler, RemoteSource, ScopeMapping,
    SnapshotStore, SourceKind, SyncReport,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// The polling loop for one configured source.
pub struct SourceRunner {
    kind: SourceKind,
    poll_interval: Duration,
    source: Arc<dyn RemoteSource>,
    mirror: Arc<dyn MirrorService>,
    store: Arc<dyn SnapshotStore>,
    scopes: Vec<ScopeMapping>,
    health: Arc<Mutex<DaemonHealth>>,
}

impl SourceRunner {
    pub fn new(
        kind: SourceKind,
        poll_interval: Duration,
        source: Arc<dyn RemoteSource>,
        mirror: Arc<dyn MirrorService>,
        store: Arc<dyn SnapshotStore>,
        scopes: Vec<ScopeMapping>,
        health: Arc<Mutex<DaemonHealth>>,
    ) -> Self {
        Self { kind, poll_interval, source, mirror, store, scopes, health }
    }

    /// Poll until the shutdown signal flips. The first pass runs
    /// immediately; later passes follow the configured interval.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = %self.kind,
            interval_secs = self.poll_interval.as_secs(),
            scopes = self.scopes.len(),
            "source runner started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_pass().await;
                }
                _ = shutdown.changed() => {
                    info!(source = %self.kind, "source runner stopping");
                    return;
                }
            }
        }
    }

    /// One full pass: every scope swept, then reconciled. A scope failure
    /// is recorded and the remaining scopes still run.
    pub async fn run_pass(&self) {
        let mut pass_report = SyncReport::new();

        for scope in &self.scopes {
            // Sweep needs the resolved container; resolution failure skips
            // the sweep but the reconciler still gets its own chance (and
            // reports the scope failure itself).
            match self.mirror.resolve_container_id(&scope.container).await {
                Ok(container_id) => {
                    let removed =
                        sweep_stale(&*self.mirror, &*self.store, &scope.list_id, &container_id)
                            .await;
                    if removed > 0 {
                        info!(source = %self.kind, removed, "dropped stale snapshots");
                    }
                }
                Err(e) => {
                    warn!(source = %self.kind, list = %scope.list_id, error = %e, "sweep skipped");
                }
            }

            let result = if self.kind.is_bidirectional() {
                BidirReconciler::new(self.kind, &*self.source, &*self.mirror, &*self.store)
                    .reconcile(scope)
                    .await
            } else {
                OneWayReconciler::new(self.kind, &*self.source, &*self.mirror, &*self.store)
                    .reconcile(scope)
                    .await
            };

            match result {
                Ok(report) => {
                    if report.has_changes() || !report.errors.is_empty() {
                        info!(
                            source = %self.kind,
                            list = %scope.list_id,
                            created = report.created,
                            updated = report.updated,
                            deleted = report.deleted,
                            completed = report.completed,
                            created_in_source = report.created_in_source,
                            updated_in_source = report.updated_in_source,
                            errors = report.errors.len(),
                            "scope reconciled"
                        );
                    }
                    pass_report.merge(report);
                }
                Err(e) => {
                    error!(source = %self.kind, list = %scope.list_id, error = %e, "scope failed");
                    pass_report.success = false;
                    pass_report.record_error(&scope.list_id, e);
                }
            }
        }

        self.health
            .lock()
            .unwrap()
            .record_pass(self.kind, &pass_report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_core::memory::{MemoryMirror, MemoryRemote, MemorySnapshotStore};
    use mirror_core::{ContainerRef, ItemStatus, SourceItem};

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

    fn scope() -> ScopeMapping {
        ScopeMapping::new("list-1", ContainerRef::Inbox)
    }

    #[tokio::test]
    async fn test_pass_reconciles_and_records_health() {
        let source = Arc::new(MemoryRemote::new());
        source.seed(vec![item("n1", "First"), item("n2", "Second")]);
        let mirror = Arc::new(MemoryMirror::new());
        let store = Arc::new(MemorySnapshotStore::new());
        let health = Arc::new(Mutex::new(DaemonHealth::new()));

        let runner = SourceRunner::new(
            SourceKind::GoogleTasks,
            Duration::from_secs(60),
            source,
            mirror.clone(),
            store.clone(),
            vec![scope()],
            health.clone(),
        );
        runner.run_pass().await;

        assert_eq!(mirror.task_count(), 2);
        assert_eq!(store.len(), 2);
        let health = health.lock().unwrap();
        assert_eq!(health.passes_completed, 1);
        assert_eq!(health.passes_failed, 0);
        assert_eq!(health.items_created, 2);
    }

    #[tokio::test]
    async fn test_scope_failure_does_not_stop_other_scopes() {
        let source = Arc::new(MemoryRemote::new());
        source.seed(vec![item("n1", "First")]);
        let mirror = Arc::new(MemoryMirror::new());
        let store = Arc::new(MemorySnapshotStore::new());
        let health = Arc::new(Mutex::new(DaemonHealth::new()));

        // First scope points at a container that does not exist.
        let broken = ScopeMapping::new("list-1", ContainerRef::Named("missing".into()));

        let runner = SourceRunner::new(
            SourceKind::GoogleTasks,
            Duration::from_secs(60),
            source,
            mirror.clone(),
            store,
            vec![broken, scope()],
            health.clone(),
        );
        runner.run_pass().await;

        // The healthy scope still mirrored its item.
        assert_eq!(mirror.task_count(), 1);
        let health = health.lock().unwrap();
        assert_eq!(health.passes_failed, 1);
        assert!(!health.last_pass[&SourceKind::GoogleTasks].success);
    }

    #[tokio::test]
    async fn test_runner_stops_on_shutdown_signal() {
        let runner = SourceRunner::new(
            SourceKind::GoogleTasks,
            Duration::from_secs(3600),
            Arc::new(MemoryRemote::new()),
            Arc::new(MemoryMirror::new()),
            Arc::new(MemorySnapshotStore::new()),
            vec![scope()],
            Arc::new(Mutex::new(DaemonHealth::new())),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(runner.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner should stop promptly")
            .unwrap();
    }
}
