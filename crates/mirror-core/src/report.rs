//! Result tallies emitted by a reconcile pass.
//!
//! This is the sole externally visible output of the engine and feeds
//! monitoring, so the field set is a stable contract.

use serde::Serialize;

/// Counters accumulated over one scope's reconcile pass.
///
/// The base counters describe effects on the mirrored service; the
/// `*_in_source` counters exist for the bi-directional path and describe
/// writes pushed back to the native platform. `skipped` counts remote items
/// dropped by the assignment filter.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    pub completed: u32,
    pub deleted_from_source: u32,
    pub tags_updated: u32,
    pub skipped: u32,
    pub created_in_source: u32,
    pub updated_in_source: u32,
    pub completed_in_source: u32,
    pub errors: Vec<String>,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            success: true,
            created: 0,
            updated: 0,
            deleted: 0,
            completed: 0,
            deleted_from_source: 0,
            tags_updated: 0,
            skipped: 0,
            created_in_source: 0,
            updated_in_source: 0,
            completed_in_source: 0,
            errors: Vec::new(),
        }
    }

    /// Record a per-item failure. Never aborts the pass.
    pub fn record_error(&mut self, context: &str, err: impl std::fmt::Display) {
        self.errors.push(format!("{context}: {err}"));
    }

    /// Fold another scope's tallies into this one. `success` only ever
    /// degrades.
    pub fn merge(&mut self, other: SyncReport) {
        self.success = self.success && other.success;
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.completed += other.completed;
        self.deleted_from_source += other.deleted_from_source;
        self.tags_updated += other.tags_updated;
        self.skipped += other.skipped;
        self.created_in_source += other.created_in_source;
        self.updated_in_source += other.updated_in_source;
        self.completed_in_source += other.completed_in_source;
        self.errors.extend(other.errors);
    }

    /// Whether the pass did anything at all.
    pub fn has_changes(&self) -> bool {
        self.created > 0
            || self.updated > 0
            || self.deleted > 0
            || self.completed > 0
            || self.deleted_from_source > 0
            || self.tags_updated > 0
            || self.created_in_source > 0
            || self.updated_in_source > 0
            || self.completed_in_source > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates_and_degrades_success() {
        let mut total = SyncReport::new();
        let mut a = SyncReport::new();
        a.created = 2;
        a.tags_updated = 1;
        let mut b = SyncReport::new();
        b.success = false;
        b.errors.push("boom".into());

        total.merge(a);
        total.merge(b);

        assert_eq!(total.created, 2);
        assert_eq!(total.tags_updated, 1);
        assert!(!total.success);
        assert_eq!(total.errors.len(), 1);
    }

    #[test]
    fn test_has_changes() {
        let mut report = SyncReport::new();
        assert!(!report.has_changes());
        report.skipped = 3;
        assert!(!report.has_changes());
        report.deleted = 1;
        assert!(report.has_changes());
    }
}
