//! Stale-cache sweep, run once per scope before reconciliation.
//!
//! A human deleting a mirrored task directly would otherwise leave a
//! snapshot row pointing at nothing, and the reconciler would fail the same
//! write against it every cycle. Staleness is hygiene, not correctness:
//! every failure here is logged and swallowed so the sweep can never block
//! the reconciliation that follows.

use crate::clients::MirrorService;
use crate::snapshot::SnapshotStore;
use tracing::{debug, warn};

/// Remove the given list's snapshot rows whose mirrored counterpart no
/// longer exists in the given container. Rows from other lists share the
/// store but keep their tasks elsewhere, so they are never touched.
/// Returns how many rows were dropped.
pub async fn sweep_stale(
    mirror: &dyn MirrorService,
    store: &dyn SnapshotStore,
    list_id: &str,
    container_id: &str,
) -> usize {
    let valid_ids = match mirror.list_item_ids(container_id).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(container = %container_id, error = %e, "stale-cache sweep skipped");
            return 0;
        }
    };

    let rows = match store.all_mirrored().await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(container = %container_id, error = %e, "stale-cache sweep skipped");
            return 0;
        }
    };

    let mut removed = 0;
    for row in rows {
        if row.list_id != list_id {
            continue;
        }
        let Some(mirror_id) = &row.mirror_id else { continue };
        if valid_ids.contains(mirror_id) {
            continue;
        }
        match store.delete(&row.native_id).await {
            Ok(()) => {
                debug!(native_id = %row.native_id, mirror_id = %mirror_id, "dropped stale snapshot");
                removed += 1;
            }
            Err(e) => {
                warn!(native_id = %row.native_id, error = %e, "failed to drop stale snapshot");
            }
        }
    }
    removed
}
