//! Bi-directional reconciliation for sources the end user can also edit
//! through the mirrored service (Microsoft To-Do).
//!
//! Five phases per scope:
//!
//! 1. Assignment filter over the remote set
//! 2. Remote-driven pass: create, match for conflict resolution, or recreate
//!    when the mirrored counterpart was deleted (the remote platform is
//!    authoritative for existence)
//! 3. Conflict resolution per matched pair; completion mismatch outranks
//!    content mismatch and defers content to the next cycle
//! 4. Mirrored-driven pass: unmatched mirrored tasks were created by the
//!    user and propagate back to the native platform
//! 5. Orphan cleanup over snapshot rows with no surviving native item
//!
//! The remote fetch always includes completed items; a completion must never
//! look like a deletion here.

use crate::clients::{MirrorService, RemoteSource};
use crate::detect;
use crate::error::{Result, SyncError};
use crate::item::{ItemStatus, MirrorFields, MirrorTask, SourceItem, SourceKind};
use crate::mapper;
use crate::report::SyncReport;
use crate::resolve::{self, Resolution};
use crate::scope::ScopeMapping;
use crate::snapshot::{Snapshot, SnapshotStore};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub struct BidirReconciler<'a> {
    kind: SourceKind,
    source: &'a dyn RemoteSource,
    mirror: &'a dyn MirrorService,
    store: &'a dyn SnapshotStore,
}

impl<'a> BidirReconciler<'a> {
    pub fn new(
        kind: SourceKind,
        source: &'a dyn RemoteSource,
        mirror: &'a dyn MirrorService,
        store: &'a dyn SnapshotStore,
    ) -> Self {
        Self { kind, source, mirror, store }
    }

    /// Reconcile one scope in both directions.
    ///
    /// `Err` is reserved for scope setup failures; everything past setup
    /// degrades the report instead of aborting.
    pub async fn reconcile(&self, mapping: &ScopeMapping) -> Result<SyncReport> {
        let container_id = self
            .mirror
            .resolve_container_id(&mapping.container)
            .await
            .map_err(|e| SyncError::Scope(e.to_string()))?;

        let remote_items = self
            .source
            .list_items(&mapping.list_id, true)
            .await
            .map_err(|e| SyncError::Scope(e.to_string()))?;

        let mirror_tasks = self
            .mirror
            .list_items(&container_id)
            .await
            .map_err(|e| SyncError::Scope(e.to_string()))?;

        let mut report = SyncReport::new();
        if let Err(e) = self
            .run(mapping, &container_id, remote_items, mirror_tasks, &mut report)
            .await
        {
            warn!(source = %self.kind, list = %mapping.list_id, error = %e, "reconcile pass failed");
            report.success = false;
            report.record_error("pass", e);
        }

        Ok(report)
    }

    async fn run(
        &self,
        mapping: &ScopeMapping,
        container_id: &str,
        remote_items: Vec<SourceItem>,
        mirror_tasks: Vec<MirrorTask>,
        report: &mut SyncReport,
    ) -> Result<()> {
        // Phase 1: drop items attributed to somebody else before anything
        // can act on them. Skipped items still count as present: phase 5
        // must never read an item assigned away as a native deletion.
        let me = self.source.authenticated_user();
        let mut remote_ids: HashSet<String> = HashSet::new();
        let mut items: Vec<SourceItem> = Vec::with_capacity(remote_items.len());
        for item in remote_items {
            remote_ids.insert(item.id.clone());
            if mapping.filter_assignee {
                if let Some(owner) = &item.assigned_to {
                    if me.as_ref() != Some(owner) {
                        debug!(source = %self.kind, native_id = %item.id, owner = %owner, "skipping item assigned to another user");
                        report.skipped += 1;
                        continue;
                    }
                }
            }
            items.push(item);
        }

        let mirror_by_id: HashMap<&str, &MirrorTask> =
            mirror_tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let fetched_mirror_ids: HashSet<&str> = mirror_by_id.keys().copied().collect();
        let mut matched: HashSet<String> = HashSet::new();

        // Phases 2 and 3.
        for item in &items {
            if let Err(e) = self
                .sync_remote_item(item, mapping, container_id, &mirror_by_id, &mut matched, report)
                .await
            {
                warn!(source = %self.kind, native_id = %item.id, error = %e, "item sync failed");
                report.record_error(&item.id, e);
            }
        }

        // Phase 4: anything on the mirrored side we have never tracked was
        // created there by the user.
        for task in &mirror_tasks {
            if matched.contains(&task.id) {
                continue;
            }
            if self.store.get_by_mirror_id(&task.id).await?.is_some() {
                // Tracked but its native item vanished; phase 5 decides.
                continue;
            }
            if let Err(e) = self.adopt_mirror_task(task, mapping, &mut remote_ids, report).await {
                warn!(source = %self.kind, mirror_id = %task.id, error = %e, "adopting mirrored task failed");
                report.record_error(&task.id, e);
            }
        }

        // Phase 5.
        self.cleanup_orphans(mapping, &remote_ids, &fetched_mirror_ids, report).await?;
        Ok(())
    }

    async fn sync_remote_item(
        &self,
        item: &SourceItem,
        mapping: &ScopeMapping,
        container_id: &str,
        mirror_by_id: &HashMap<&str, &MirrorTask>,
        matched: &mut HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let Some(snapshot) = self.store.get(&item.id).await? else {
            return self.create_mirrored(item, mapping, container_id, report).await;
        };

        match snapshot.mirror_id.clone() {
            Some(mirror_id) if mirror_by_id.contains_key(mirror_id.as_str()) => {
                matched.insert(mirror_id.clone());
                let task = mirror_by_id[mirror_id.as_str()];
                self.reconcile_pair(item, task, snapshot, mapping, report).await
            }
            // Mirrored counterpart is gone; the remote platform is
            // authoritative for existence, so recreate from current remote
            // state.
            _ => self.recreate_mirrored(item, snapshot, mapping, container_id, report).await,
        }
    }

    /// Create the mirrored task, completing it when the remote item is.
    /// A failed completion rolls the create back: an untracked task left
    /// behind would be adopted as a duplicate native item next cycle.
    async fn create_task_for(&self, item: &SourceItem, fields: &MirrorFields) -> Result<String> {
        let mirror_id = self.mirror.create_task(fields).await?;
        if item.status.is_completed() {
            if let Err(e) = self.mirror.set_completion(&mirror_id, true).await {
                if let Err(rollback) = self.mirror.delete_task(&mirror_id).await {
                    warn!(source = %self.kind, mirror_id = %mirror_id, error = %rollback, "rollback of partial create failed");
                }
                return Err(e);
            }
        }
        Ok(mirror_id)
    }

    async fn create_mirrored(
        &self,
        item: &SourceItem,
        mapping: &ScopeMapping,
        container_id: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        let fields =
            mapper::to_mirror_fields(self.kind, item, &mapping.tags, Some(container_id), None);
        let mirror_id = self.create_task_for(item, &fields).await?;

        let mut snapshot = Snapshot::from_item(item, Some(mirror_id.clone()), &mapping.tags);
        snapshot.remote_marker = Some(detect::marker_for(item));
        snapshot.touch_mirror_marker();
        self.store.insert(snapshot).await?;
        report.created += 1;
        debug!(source = %self.kind, native_id = %item.id, mirror_id = %mirror_id, "created mirrored task");
        Ok(())
    }

    async fn recreate_mirrored(
        &self,
        item: &SourceItem,
        mut snapshot: Snapshot,
        mapping: &ScopeMapping,
        container_id: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        let fields =
            mapper::to_mirror_fields(self.kind, item, &mapping.tags, Some(container_id), None);
        let mirror_id = self.create_task_for(item, &fields).await?;

        snapshot.absorb_item(item);
        snapshot.remote_marker = Some(detect::marker_for(item));
        snapshot.mirror_id = Some(mirror_id.clone());
        snapshot.applied_tags = mapping.tags.clone();
        snapshot.touch_mirror_marker();
        self.store.update(snapshot).await?;
        report.created += 1;
        debug!(source = %self.kind, native_id = %item.id, mirror_id = %mirror_id, "recreated mirrored task after mirrored-side deletion");
        Ok(())
    }

    /// Phase 3: one matched pair.
    async fn reconcile_pair(
        &self,
        item: &SourceItem,
        task: &MirrorTask,
        mut snapshot: Snapshot,
        mapping: &ScopeMapping,
        report: &mut SyncReport,
    ) -> Result<()> {
        let mirror_id = task.id.clone();

        // Completion-status mismatch outranks content; content reconciliation
        // waits until the next cycle.
        if let Some(resolution) = resolve::resolve_completion(item, task, &snapshot) {
            match resolution {
                Resolution::RemoteWins => {
                    self.mirror
                        .set_completion(&mirror_id, item.status.is_completed())
                        .await?;
                    snapshot.status = item.status;
                    snapshot.remote_marker = Some(detect::marker_for(item));
                    snapshot.touch_mirror_marker();
                    report.completed += 1;
                }
                Resolution::MirrorWins => {
                    self.source
                        .set_completion(&mapping.list_id, &item.id, task.completed)
                        .await?;
                    snapshot.status = ItemStatus::from_completed(task.completed);
                    // Our write just bumped the remote timestamp; drop the
                    // stored marker so the next cycle re-baselines by fields.
                    snapshot.remote_marker = None;
                    snapshot.synced_at = Utc::now();
                    report.completed_in_source += 1;
                }
                Resolution::NoConflict => unreachable!("mismatch already established"),
            }
            self.store.update(snapshot).await?;
            return Ok(());
        }

        let mut dirty = false;
        match resolve::resolve(item, task, &snapshot, mapping.conflict_policy) {
            Resolution::NoConflict => {
                // Re-baseline the marker when the timestamp moved without a
                // content change (e.g. after our own write to the source).
                let marker = detect::marker_for(item);
                if snapshot.remote_marker.as_ref() != Some(&marker) {
                    snapshot.absorb_item(item);
                    snapshot.remote_marker = Some(marker);
                    dirty = true;
                }
            }
            Resolution::RemoteWins => {
                let fields = mapper::to_mirror_fields(self.kind, item, &mapping.tags, None, None);
                self.mirror.update_task(&mirror_id, &fields).await?;
                snapshot.absorb_item(item);
                snapshot.remote_marker = Some(detect::marker_for(item));
                snapshot.touch_mirror_marker();
                report.updated += 1;
                dirty = true;
            }
            Resolution::MirrorWins => {
                let fields = mapper::to_source_fields(self.kind, task);
                self.source.update_item(&mapping.list_id, &item.id, &fields).await?;
                snapshot.absorb_task(task);
                snapshot.remote_marker = None;
                report.updated_in_source += 1;
                dirty = true;
            }
        }

        // Tags are configuration-driven and independent of content.
        if detect::tags_changed(&snapshot.applied_tags, &mapping.tags) {
            self.mirror.set_labels(&mirror_id, &mapping.tags).await?;
            snapshot.applied_tags = mapping.tags.clone();
            report.tags_updated += 1;
            dirty = true;
        }

        if dirty {
            self.store.update(snapshot).await?;
        }
        Ok(())
    }

    /// Phase 4: a mirrored task we have never tracked propagates to the
    /// native platform.
    async fn adopt_mirror_task(
        &self,
        task: &MirrorTask,
        mapping: &ScopeMapping,
        remote_ids: &mut HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let fields = mapper::to_source_fields(self.kind, task);
        let native_id = self.source.create_item(&mapping.list_id, &fields).await?;
        if task.completed {
            self.source.set_completion(&mapping.list_id, &native_id, true).await?;
        }

        let snapshot = Snapshot {
            native_id: native_id.clone(),
            mirror_id: Some(task.id.clone()),
            list_id: mapping.list_id.clone(),
            parent_native_id: None,
            title: task.content.clone(),
            notes: task.description.clone(),
            status: ItemStatus::from_completed(task.completed),
            due: task.due.clone(),
            remote_marker: None,
            mirror_marker: None,
            applied_tags: task.labels.clone(),
            synced_at: Utc::now(),
        };
        self.store.insert(snapshot).await?;
        remote_ids.insert(native_id.clone());
        report.created_in_source += 1;
        debug!(source = %self.kind, native_id = %native_id, mirror_id = %task.id, "adopted user-created mirrored task");
        Ok(())
    }

    /// Phase 5: rows whose native item disappeared. If the mirrored task
    /// survives, the native deletion propagates; if both sides are gone the
    /// row is simply dropped.
    async fn cleanup_orphans(
        &self,
        mapping: &ScopeMapping,
        remote_ids: &HashSet<String>,
        fetched_mirror_ids: &HashSet<&str>,
        report: &mut SyncReport,
    ) -> Result<()> {
        for snapshot in self.store.all().await? {
            // The store is shared by every mapping of this source; rows
            // belonging to other lists are not this scope's to judge.
            if snapshot.list_id != mapping.list_id {
                continue;
            }
            if remote_ids.contains(&snapshot.native_id) {
                continue;
            }

            let surviving_mirror = snapshot
                .mirror_id
                .as_deref()
                .filter(|m| fetched_mirror_ids.contains(m));

            match surviving_mirror {
                Some(mirror_id) => {
                    if let Err(e) = self.mirror.delete_task(mirror_id).await {
                        // Keep the row and retry next cycle rather than
                        // orphaning the mirrored task.
                        warn!(source = %self.kind, mirror_id = %mirror_id, error = %e, "orphan delete failed");
                        report.record_error(&snapshot.native_id, e);
                        continue;
                    }
                    self.store.delete(&snapshot.native_id).await?;
                    report.deleted += 1;
                }
                None => {
                    // Both sides independently removed it.
                    self.store.delete(&snapshot.native_id).await?;
                }
            }
        }
        Ok(())
    }
}
