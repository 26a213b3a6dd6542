//! Scope configuration: one mapping between a native list/category and a
//! mirrored-service container.

use crate::clients::ContainerRef;
use crate::resolve::ConflictPolicy;

/// Configuration for one synced scope.
#[derive(Debug, Clone)]
pub struct ScopeMapping {
    /// Native list/category ID to fetch.
    pub list_id: String,
    /// Mirrored-service container items land in.
    pub container: ContainerRef,
    /// Whether completed remote items are fetched and mirrored.
    pub include_completed: bool,
    /// Delete the native item (and its snapshot) immediately after a
    /// successful mirror. One-way sources only.
    pub delete_after_sync: bool,
    /// Category labels applied to every mirrored item in this scope.
    /// Configuration, not remote state, is authoritative for these.
    pub tags: Vec<String>,
    /// Drop remote items attributed to a different user than the
    /// authenticated identity. Bi-directional sources only.
    pub filter_assignee: bool,
    /// Tie-break when both sides changed and markers are not comparable.
    pub conflict_policy: ConflictPolicy,
}

impl ScopeMapping {
    /// A minimal mapping with the defaults the daemon config uses.
    pub fn new(list_id: impl Into<String>, container: ContainerRef) -> Self {
        Self {
            list_id: list_id.into(),
            container,
            include_completed: false,
            delete_after_sync: false,
            tags: Vec::new(),
            filter_assignee: false,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}
