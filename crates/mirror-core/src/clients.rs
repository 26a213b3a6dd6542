//! Collaborator traits for the two stores the reconcilers mutate.
//!
//! One `RemoteSource` implementation exists per platform; the daemon wraps
//! them in a retry layer, so the reconcilers only ever see final success or
//! final failure. The reconciliation core owns no wire protocol.

use crate::error::Result;
use crate::item::{MirrorFields, MirrorTask, SourceFields, SourceItem};
use async_trait::async_trait;
use std::collections::HashSet;

/// Reference to a mirrored-service container, resolved once per scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRef {
    /// The service's default inbox container.
    Inbox,
    /// A container looked up by name.
    Named(String),
}

impl ContainerRef {
    /// Parse the configuration spelling: the literal `inbox` is the sentinel
    /// for the default container.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("inbox") {
            ContainerRef::Inbox
        } else {
            ContainerRef::Named(raw.to_string())
        }
    }
}

/// A native task platform, read-side plus the writes the reconcilers need.
///
/// One-way sources only ever see `list_items` and (with `delete_after_sync`)
/// `delete_item`; the remaining write operations exist for the bi-directional
/// path.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the current item set for one native list.
    async fn list_items(&self, list_id: &str, include_completed: bool) -> Result<Vec<SourceItem>>;

    /// Create an item on the native platform, returning its new native ID.
    async fn create_item(&self, list_id: &str, fields: &SourceFields) -> Result<String>;

    /// Update an item's content fields.
    async fn update_item(&self, list_id: &str, id: &str, fields: &SourceFields) -> Result<()>;

    /// Complete or reopen an item.
    async fn set_completion(&self, list_id: &str, id: &str, completed: bool) -> Result<()>;

    /// Delete an item from the native platform.
    async fn delete_item(&self, list_id: &str, id: &str) -> Result<()>;

    /// Identity the client is authenticated as, for assignment filtering.
    /// `None` when the platform has no attribution concept.
    fn authenticated_user(&self) -> Option<String>;
}

/// The task-management service every source is consolidated into.
#[async_trait]
pub trait MirrorService: Send + Sync {
    /// Resolve a container reference to its ID. Fails the scope if the
    /// container does not exist.
    async fn resolve_container_id(&self, container: &ContainerRef) -> Result<String>;

    /// Fetch all open tasks in a container (bi-directional reconciliation).
    async fn list_items(&self, container_id: &str) -> Result<Vec<MirrorTask>>;

    /// Fetch just the set of valid task IDs in a container (stale-cache sweep).
    async fn list_item_ids(&self, container_id: &str) -> Result<HashSet<String>>;

    /// Create a task, returning its ID.
    async fn create_task(&self, fields: &MirrorFields) -> Result<String>;

    /// Update a task's content fields. Labels are not touched here.
    async fn update_task(&self, id: &str, fields: &MirrorFields) -> Result<()>;

    /// Replace a task's label set. Distinct from content updates so
    /// relabeling never counts as (or requires) a content write.
    async fn set_labels(&self, id: &str, labels: &[String]) -> Result<()>;

    /// Complete or reopen a task. The service models completion as an action,
    /// not a field write, so this is always its own call.
    async fn set_completion(&self, id: &str, completed: bool) -> Result<()>;

    /// Delete a task.
    async fn delete_task(&self, id: &str) -> Result<()>;
}
