//! Canonical item shapes shared by the reconcilers.
//!
//! Platform payloads are heterogeneous; normalization adapters at the
//! collaborator boundary produce these shapes so the reconciliation core
//! never sees raw API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which native platform an item (and its snapshot partition) belongs to.
///
/// Alexa reminders and Alexa shopping items are separate kinds: they live in
/// separate snapshot partitions and map fields differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GoogleTasks,
    AlexaReminders,
    AlexaShopping,
    MicrosoftTodo,
}

impl SourceKind {
    /// Whether edits on the mirrored service propagate back to this platform.
    pub fn is_bidirectional(&self) -> bool {
        matches!(self, SourceKind::MicrosoftTodo)
    }

    /// Stable name used for snapshot partition files and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::GoogleTasks => "google_tasks",
            SourceKind::AlexaReminders => "alexa_reminders",
            SourceKind::AlexaShopping => "alexa_shopping",
            SourceKind::MicrosoftTodo => "microsoft_todo",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion state, normalized across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Open,
    Completed,
}

impl ItemStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, ItemStatus::Completed)
    }

    pub fn from_completed(completed: bool) -> Self {
        if completed {
            ItemStatus::Completed
        } else {
            ItemStatus::Open
        }
    }
}

/// A native-platform item after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    /// Platform-assigned ID, unique and immutable within a (source, kind) partition.
    pub id: String,
    /// The native list/category this item belongs to.
    pub list_id: String,
    /// Native ID of the parent item, for single-level subtask hierarchy.
    pub parent_id: Option<String>,
    pub title: String,
    pub notes: Option<String>,
    pub status: ItemStatus,
    /// Due date as the platform reports it (date or RFC 3339 datetime).
    pub due: Option<String>,
    /// Remote modification timestamp, when the platform exposes one.
    pub modified_at: Option<DateTime<Utc>>,
    /// User the item is attributed to, when the platform supports assignment.
    pub assigned_to: Option<String>,
}

/// A task as it exists on the mirrored service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorTask {
    pub id: String,
    pub content: String,
    pub description: Option<String>,
    pub due: Option<String>,
    pub completed: bool,
    pub labels: Vec<String>,
    pub parent_id: Option<String>,
}

/// Field payload for creating or updating a mirrored task.
///
/// Labels are included on create; label-only changes go through
/// `MirrorService::set_labels` instead so relabeling never rewrites content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorFields {
    pub content: String,
    pub description: Option<String>,
    pub due: Option<String>,
    pub labels: Vec<String>,
    pub container_id: Option<String>,
    pub parent_id: Option<String>,
}

/// Field payload for writes back to a native platform (bi-directional only).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFields {
    pub title: String,
    pub notes: Option<String>,
    pub due: Option<String>,
}
