//! Conflict resolution for bi-directional sources.
//!
//! Pure functions, no side effects. Given the same inputs they always return
//! the same winner, which is what makes the bi-directional pass deterministic
//! across retries and restarts.

use crate::detect;
use crate::item::{ItemStatus, MirrorTask, SourceItem};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Tie-break policy when both sides changed and neither modification marker
/// is comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The native platform's values win.
    PreferSource,
    /// The mirrored service's values win. Default: the mirrored set is
    /// fetched after the remote set, so this keeps the most recently
    /// observed state.
    #[default]
    PreferMirror,
    /// Whichever side has the newer modification marker wins; falls back to
    /// the mirrored side when the markers are not comparable.
    LastWriteWins,
}

/// Winner designator for a matched (remote, mirrored) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    RemoteWins,
    MirrorWins,
    NoConflict,
}

/// Resolve a completion-status mismatch.
///
/// Returns `None` when both sides agree on completion. Status disagreement
/// takes priority over content disagreement: the winner is whichever side's
/// modification marker is newer, and if the remote timestamp is unavailable
/// or not newer, the mirrored side wins.
pub fn resolve_completion(
    remote: &SourceItem,
    mirror: &MirrorTask,
    snapshot: &Snapshot,
) -> Option<Resolution> {
    if remote.status == ItemStatus::from_completed(mirror.completed) {
        return None;
    }

    match (remote.modified_at, snapshot.mirror_marker) {
        (Some(remote_ts), Some(mirror_ts)) if remote_ts > mirror_ts => Some(Resolution::RemoteWins),
        _ => Some(Resolution::MirrorWins),
    }
}

/// Resolve content changes on a matched pair.
///
/// Each side's change is detected independently: the remote item against its
/// stored marker, the mirrored task by field comparison (its service exposes
/// no timestamps). Exactly one changed side wins outright; when both changed
/// the policy decides.
pub fn resolve(
    remote: &SourceItem,
    mirror: &MirrorTask,
    snapshot: &Snapshot,
    policy: ConflictPolicy,
) -> Resolution {
    let remote_changed = detect::remote_changed(remote, snapshot);
    let mirror_changed = detect::mirror_changed(mirror, snapshot);

    match (remote_changed, mirror_changed) {
        (false, false) => Resolution::NoConflict,
        (true, false) => Resolution::RemoteWins,
        (false, true) => Resolution::MirrorWins,
        (true, true) => match policy {
            ConflictPolicy::PreferSource => Resolution::RemoteWins,
            ConflictPolicy::PreferMirror => Resolution::MirrorWins,
            ConflictPolicy::LastWriteWins => {
                match (remote.modified_at, snapshot.mirror_marker) {
                    (Some(remote_ts), Some(mirror_ts)) if remote_ts > mirror_ts => {
                        Resolution::RemoteWins
                    }
                    _ => Resolution::MirrorWins,
                }
            }
        },
    }
}
