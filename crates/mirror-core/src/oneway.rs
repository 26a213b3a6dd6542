//! One-way reconciliation for sources the mirrored service never writes
//! back to (Google Tasks, Alexa reminders, Alexa shopping).
//!
//! Three phases per scope:
//!
//! 1. Creation/update pass over every fetched remote item, parents before
//!    children so a child can reference its parent's mirrored ID
//! 2. Deletion pass over snapshot rows whose native ID was not fetched
//! 3. Tally accumulation; any per-item failure is recorded and the pass
//!    moves on to the next item

use crate::clients::{MirrorService, RemoteSource};
use crate::detect;
use crate::error::{Result, SyncError};
use crate::item::{ItemStatus, SourceItem, SourceKind};
use crate::mapper;
use crate::report::SyncReport;
use crate::scope::ScopeMapping;
use crate::snapshot::{Snapshot, SnapshotStore};
use std::collections::HashSet;
use tracing::{debug, warn};

pub struct OneWayReconciler<'a> {
    kind: SourceKind,
    source: &'a dyn RemoteSource,
    mirror: &'a dyn MirrorService,
    store: &'a dyn SnapshotStore,
}

impl<'a> OneWayReconciler<'a> {
    pub fn new(
        kind: SourceKind,
        source: &'a dyn RemoteSource,
        mirror: &'a dyn MirrorService,
        store: &'a dyn SnapshotStore,
    ) -> Self {
        Self { kind, source, mirror, store }
    }

    /// Reconcile one scope.
    ///
    /// Returns `Err` only for scope setup failures (container resolution,
    /// remote fetch); anything that escapes the per-item guards afterwards
    /// marks the report unsuccessful but still returns the partial tallies.
    pub async fn reconcile(&self, mapping: &ScopeMapping) -> Result<SyncReport> {
        let container_id = self
            .mirror
            .resolve_container_id(&mapping.container)
            .await
            .map_err(|e| SyncError::Scope(e.to_string()))?;

        let items = self
            .source
            .list_items(&mapping.list_id, mapping.include_completed)
            .await
            .map_err(|e| SyncError::Scope(e.to_string()))?;

        let mut report = SyncReport::new();
        if let Err(e) = self.run(mapping, &container_id, items, &mut report).await {
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
        mut items: Vec<SourceItem>,
        report: &mut SyncReport,
    ) -> Result<()> {
        // Parents before children; stable sort preserves fetch order otherwise.
        items.sort_by_key(|i| i.parent_id.is_some());

        let seen: HashSet<String> = items.iter().map(|i| i.id.clone()).collect();

        for item in &items {
            if let Err(e) = self.mirror_one(item, mapping, container_id, report).await {
                warn!(source = %self.kind, native_id = %item.id, error = %e, "item sync failed");
                report.record_error(&item.id, e);
            }
        }

        self.delete_unseen(mapping, &seen, report).await?;
        Ok(())
    }

    /// Create or update the mirrored counterpart of one remote item.
    async fn mirror_one(
        &self,
        item: &SourceItem,
        mapping: &ScopeMapping,
        container_id: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        match self.store.get(&item.id).await? {
            Some(snapshot) if snapshot.mirror_id.is_some() => {
                self.update_mirrored(item, snapshot, mapping, report).await
            }
            // No snapshot, or a row that never got its mirrored counterpart.
            _ => self.create_mirrored(item, mapping, container_id, report).await,
        }
    }

    async fn create_mirrored(
        &self,
        item: &SourceItem,
        mapping: &ScopeMapping,
        container_id: &str,
        report: &mut SyncReport,
    ) -> Result<()> {
        // The parent was processed earlier in this pass, so its row exists.
        let parent_mirror_id = match &item.parent_id {
            Some(parent) => self.store.get(parent).await?.and_then(|s| s.mirror_id),
            None => None,
        };

        let fields = mapper::to_mirror_fields(
            self.kind,
            item,
            &mapping.tags,
            Some(container_id),
            parent_mirror_id.as_deref(),
        );
        let mirror_id = self.mirror.create_task(&fields).await?;

        // The row goes in before the completion write, so a failure there
        // cannot leave an untracked task for the next pass to duplicate.
        // The open status and missing marker make the retry a status diff.
        let mut snapshot = Snapshot::from_item(item, Some(mirror_id.clone()), &mapping.tags);
        snapshot.remote_marker = Some(detect::marker_for(item));
        let needs_completion = item.status.is_completed();
        if needs_completion {
            snapshot.status = ItemStatus::Open;
            snapshot.remote_marker = None;
        }
        self.store.insert(snapshot.clone()).await?;
        report.created += 1;
        debug!(source = %self.kind, native_id = %item.id, mirror_id = %mirror_id, "created mirrored task");

        if needs_completion {
            self.mirror.set_completion(&mirror_id, true).await?;
            snapshot.status = item.status;
            snapshot.remote_marker = Some(detect::marker_for(item));
            self.store.update(snapshot).await?;
        }

        if mapping.delete_after_sync {
            self.delete_from_source(item, mapping, report).await?;
        }
        Ok(())
    }

    async fn update_mirrored(
        &self,
        item: &SourceItem,
        mut snapshot: Snapshot,
        mapping: &ScopeMapping,
        report: &mut SyncReport,
    ) -> Result<()> {
        let mirror_id = snapshot.mirror_id.clone().unwrap_or_default();
        let changed = detect::remote_changed(item, &snapshot);
        let tags_changed = detect::tags_changed(&snapshot.applied_tags, &mapping.tags);

        if changed {
            // A status transition is its own call; the mirrored API models
            // completion as an action, not a field write.
            if item.status != snapshot.status {
                self.mirror
                    .set_completion(&mirror_id, item.status.is_completed())
                    .await?;
                report.completed += 1;
            }

            let content_differs = item.title != snapshot.title
                || item.notes != snapshot.notes
                || item.due != snapshot.due;
            if content_differs {
                let fields =
                    mapper::to_mirror_fields(self.kind, item, &mapping.tags, None, None);
                self.mirror.update_task(&mirror_id, &fields).await?;
                report.updated += 1;
            }
        }

        if tags_changed {
            self.mirror.set_labels(&mirror_id, &mapping.tags).await?;
            report.tags_updated += 1;
        }

        if changed || tags_changed {
            snapshot.absorb_item(item);
            snapshot.remote_marker = Some(detect::marker_for(item));
            snapshot.applied_tags = mapping.tags.clone();
            self.store.update(snapshot).await?;
        }

        // Covers items synced before the flag was enabled.
        if mapping.delete_after_sync {
            self.delete_from_source(item, mapping, report).await?;
        }
        Ok(())
    }

    async fn delete_from_source(
        &self,
        item: &SourceItem,
        mapping: &ScopeMapping,
        report: &mut SyncReport,
    ) -> Result<()> {
        self.source.delete_item(&mapping.list_id, &item.id).await?;
        self.store.delete(&item.id).await?;
        report.deleted_from_source += 1;
        debug!(source = %self.kind, native_id = %item.id, "deleted from source after sync");
        Ok(())
    }

    /// Deletion pass: every snapshot row not present in the current fetch
    /// lost its native item, so its mirrored counterpart goes too.
    async fn delete_unseen(
        &self,
        mapping: &ScopeMapping,
        seen: &HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<()> {
        for snapshot in self.store.all().await? {
            // The store is shared by every mapping of this source; rows
            // belonging to other lists are not this scope's to judge.
            if snapshot.list_id != mapping.list_id {
                continue;
            }
            if seen.contains(&snapshot.native_id) {
                continue;
            }

            if let Some(mirror_id) = &snapshot.mirror_id {
                // Best effort; the mirrored item may already be gone.
                if let Err(e) = self.mirror.delete_task(mirror_id).await {
                    warn!(
                        source = %self.kind,
                        list = %mapping.list_id,
                        mirror_id = %mirror_id,
                        error = %e,
                        "mirrored delete failed, dropping snapshot anyway"
                    );
                }
            }

            self.store.delete(&snapshot.native_id).await?;
            report.deleted += 1;
        }
        Ok(())
    }
}
