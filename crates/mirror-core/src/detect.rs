//! Change detection: deciding whether a fetched item differs from its
//! snapshot, and whether its tag assignment differs from configuration.
//!
//! Timestamp comparison is preferred when both sides have one because it is
//! race-free and cheap. The field-by-field fallback exists because the
//! mirrored service's REST surface exposes no modification timestamps, so
//! edits on that side can only be discovered by content inspection.

use crate::item::{ItemStatus, MirrorTask, SourceItem};
use crate::snapshot::{ChangeMarker, Snapshot};
use sha2::{Digest, Sha256};

/// Whether the remote item has changed relative to its snapshot.
///
/// If both the remote modification timestamp and the stored marker are
/// timestamps, the item is changed iff the remote one is strictly later.
/// Otherwise falls back to comparing title, notes, status, and due date.
pub fn remote_changed(item: &SourceItem, snapshot: &Snapshot) -> bool {
    if let (Some(modified_at), Some(marker_ts)) = (
        item.modified_at,
        snapshot.remote_marker.as_ref().and_then(ChangeMarker::timestamp),
    ) {
        return modified_at > marker_ts;
    }

    item.title != snapshot.title
        || item.notes != snapshot.notes
        || item.status != snapshot.status
        || item.due != snapshot.due
}

/// Whether the mirrored task has changed relative to its snapshot.
///
/// The mirrored service exposes no modification timestamps, so this is
/// always a field comparison against the last state both sides agreed on.
pub fn mirror_changed(task: &MirrorTask, snapshot: &Snapshot) -> bool {
    task.content != snapshot.title
        || task.description != snapshot.notes
        || ItemStatus::from_completed(task.completed) != snapshot.status
        || task.due != snapshot.due
}

/// Order-independent set comparison between the applied tag set and the
/// currently configured tag set. Inequality is actioned separately from
/// content changes; relabeling never recreates an item.
pub fn tags_changed(applied: &[String], configured: &[String]) -> bool {
    if applied.len() != configured.len() {
        return true;
    }
    let mut applied: Vec<&str> = applied.iter().map(String::as_str).collect();
    let mut configured: Vec<&str> = configured.iter().map(String::as_str).collect();
    applied.sort_unstable();
    configured.sort_unstable();
    applied != configured
}

/// SHA-256 hash over the diffable content fields, used as the stored marker
/// for platforms that expose no modification timestamp.
pub fn content_hash(item: &SourceItem) -> String {
    let mut hasher = Sha256::new();
    hasher.update(item.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(item.notes.as_deref().unwrap_or("").as_bytes());
    hasher.update([0u8]);
    hasher.update([item.status.is_completed() as u8]);
    hasher.update(item.due.as_deref().unwrap_or("").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The marker to store for an item: its timestamp when available, its
/// content hash otherwise.
pub fn marker_for(item: &SourceItem) -> ChangeMarker {
    match item.modified_at {
        Some(ts) => ChangeMarker::Timestamp(ts),
        None => ChangeMarker::Hash(content_hash(item)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(title: &str) -> SourceItem {
        SourceItem {
            id: "n1".into(),
            list_id: "list".into(),
            parent_id: None,
            title: title.into(),
            notes: None,
            status: ItemStatus::Open,
            due: None,
            modified_at: None,
            assigned_to: None,
        }
    }

    fn snapshot_of(item: &SourceItem) -> Snapshot {
        Snapshot::from_item(item, Some("m1".into()), &[])
    }

    #[test]
    fn test_unchanged_item_by_fields() {
        let it = item("Buy milk");
        let snap = snapshot_of(&it);
        assert!(!remote_changed(&it, &snap));
    }

    #[test]
    fn test_changed_title_by_fields() {
        let it = item("Buy milk");
        let snap = snapshot_of(&it);
        let edited = SourceItem { title: "Buy oat milk".into(), ..it };
        assert!(remote_changed(&edited, &snap));
    }

    #[test]
    fn test_changed_status_by_fields() {
        let it = item("Buy milk");
        let snap = snapshot_of(&it);
        let done = SourceItem { status: ItemStatus::Completed, ..it };
        assert!(remote_changed(&done, &snap));
    }

    #[test]
    fn test_timestamp_comparison_wins_over_fields() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let mut it = item("Buy milk");
        it.modified_at = Some(t0);
        let snap = snapshot_of(&it);

        // Title differs but timestamp is unchanged: marker comparison rules.
        let mut edited = it.clone();
        edited.title = "Different".into();
        assert!(!remote_changed(&edited, &snap));

        // Same title but newer timestamp: changed.
        let mut touched = it.clone();
        touched.modified_at = Some(t0 + chrono::Duration::seconds(30));
        assert!(remote_changed(&touched, &snap));
    }

    #[test]
    fn test_timestamp_equal_is_unchanged() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let mut it = item("Buy milk");
        it.modified_at = Some(t0);
        let snap = snapshot_of(&it);
        assert!(!remote_changed(&it, &snap));
    }

    #[test]
    fn test_hash_marker_falls_back_to_fields() {
        let it = item("Buy milk");
        let mut snap = snapshot_of(&it);
        snap.remote_marker = Some(ChangeMarker::Hash(content_hash(&it)));

        // Timestamp exists remotely but the stored marker is a hash: field
        // comparison applies.
        let mut edited = it.clone();
        edited.modified_at = Some(Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap());
        edited.notes = Some("2%".into());
        assert!(remote_changed(&edited, &snap));
    }

    #[test]
    fn test_mirror_changed_fields() {
        let it = item("Buy milk");
        let snap = snapshot_of(&it);
        let task = MirrorTask {
            id: "m1".into(),
            content: "Buy milk".into(),
            description: None,
            due: None,
            completed: false,
            labels: vec![],
            parent_id: None,
        };
        assert!(!mirror_changed(&task, &snap));

        let edited = MirrorTask { content: "Buy bread".into(), ..task.clone() };
        assert!(mirror_changed(&edited, &snap));

        let completed = MirrorTask { completed: true, ..task };
        assert!(mirror_changed(&completed, &snap));
    }

    #[test]
    fn test_tags_changed_is_order_independent() {
        let applied = vec!["grocery".to_string(), "home".to_string()];
        let configured = vec!["home".to_string(), "grocery".to_string()];
        assert!(!tags_changed(&applied, &configured));
        assert!(tags_changed(&applied, &["grocery".to_string()]));
        assert!(tags_changed(&[], &["grocery".to_string()]));
    }

    #[test]
    fn test_content_hash_tracks_fields() {
        let a = item("Buy milk");
        let mut b = item("Buy milk");
        assert_eq!(content_hash(&a), content_hash(&b));
        b.due = Some("2024-01-15".into());
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
