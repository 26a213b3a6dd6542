//! Per-source field translators.
//!
//! Pure data-flow glue between the canonical item shape and the payloads the
//! two services accept. Each platform carries slightly different fields:
//! Google Tasks due dates are date-only, Alexa reminders put the scheduled
//! time in the due slot, shopping items are bare titles, and Microsoft tasks
//! carry a body that maps to the mirrored description.

use crate::item::{MirrorFields, MirrorTask, SourceFields, SourceItem, SourceKind};

/// Truncate an RFC 3339 datetime to its date part. Platform due fields that
/// are already dates pass through untouched.
fn date_only(due: &str) -> String {
    due.chars().take(10).collect()
}

/// Map a normalized remote item to the mirrored-service payload.
pub fn to_mirror_fields(
    kind: SourceKind,
    item: &SourceItem,
    tags: &[String],
    container_id: Option<&str>,
    parent_mirror_id: Option<&str>,
) -> MirrorFields {
    let (description, due) = match kind {
        SourceKind::GoogleTasks => {
            (item.notes.clone(), item.due.as_deref().map(date_only))
        }
        // Alexa reminders schedule a datetime; keep it whole so the mirrored
        // task carries the reminder time.
        SourceKind::AlexaReminders => (None, item.due.clone()),
        // Shopping list entries are bare titles.
        SourceKind::AlexaShopping => (None, None),
        SourceKind::MicrosoftTodo => {
            let body = item.notes.as_deref().map(str::trim).filter(|s| !s.is_empty());
            (body.map(String::from), item.due.as_deref().map(date_only))
        }
    };

    MirrorFields {
        content: item.title.clone(),
        description,
        due,
        labels: tags.to_vec(),
        container_id: container_id.map(String::from),
        parent_id: parent_mirror_id.map(String::from),
    }
}

/// Map a mirrored task back to the native-platform payload (bi-directional
/// sources only).
pub fn to_source_fields(kind: SourceKind, task: &MirrorTask) -> SourceFields {
    let notes = match kind {
        // Shopping items cannot carry notes; dropping them is deliberate.
        SourceKind::AlexaShopping => None,
        _ => task.description.clone(),
    };

    SourceFields {
        title: task.content.clone(),
        notes,
        due: task.due.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemStatus;

    fn item(kind_due: Option<&str>) -> SourceItem {
        SourceItem {
            id: "n1".into(),
            list_id: "list".into(),
            parent_id: None,
            title: "Buy milk".into(),
            notes: Some("2% please".into()),
            status: ItemStatus::Open,
            due: kind_due.map(String::from),
            modified_at: None,
            assigned_to: None,
        }
    }

    #[test]
    fn test_google_due_is_date_only() {
        let fields = to_mirror_fields(
            SourceKind::GoogleTasks,
            &item(Some("2024-01-15T00:00:00.000Z")),
            &["grocery".to_string()],
            Some("c1"),
            None,
        );
        assert_eq!(fields.due.as_deref(), Some("2024-01-15"));
        assert_eq!(fields.description.as_deref(), Some("2% please"));
        assert_eq!(fields.labels, vec!["grocery".to_string()]);
        assert_eq!(fields.container_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_alexa_reminder_keeps_datetime() {
        let fields = to_mirror_fields(
            SourceKind::AlexaReminders,
            &item(Some("2024-01-15T09:30:00")),
            &[],
            None,
            None,
        );
        assert_eq!(fields.due.as_deref(), Some("2024-01-15T09:30:00"));
        assert!(fields.description.is_none());
    }

    #[test]
    fn test_shopping_item_is_title_only() {
        let fields =
            to_mirror_fields(SourceKind::AlexaShopping, &item(Some("2024-01-15")), &[], None, None);
        assert_eq!(fields.content, "Buy milk");
        assert!(fields.due.is_none());
        assert!(fields.description.is_none());
    }

    #[test]
    fn test_microsoft_blank_body_is_dropped() {
        let mut it = item(Some("2024-01-15T00:00:00Z"));
        it.notes = Some("   \n".into());
        let fields = to_mirror_fields(SourceKind::MicrosoftTodo, &it, &[], None, None);
        assert!(fields.description.is_none());
        assert_eq!(fields.due.as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn test_parent_link_passes_through() {
        let fields =
            to_mirror_fields(SourceKind::GoogleTasks, &item(None), &[], Some("c1"), Some("m-parent"));
        assert_eq!(fields.parent_id.as_deref(), Some("m-parent"));
    }

    #[test]
    fn test_source_fields_round_trip() {
        let task = MirrorTask {
            id: "m1".into(),
            content: "Buy milk".into(),
            description: Some("2% please".into()),
            due: Some("2024-01-15".into()),
            completed: false,
            labels: vec!["grocery".into()],
            parent_id: None,
        };
        let fields = to_source_fields(SourceKind::MicrosoftTodo, &task);
        assert_eq!(fields.title, "Buy milk");
        assert_eq!(fields.notes.as_deref(), Some("2% please"));
        assert_eq!(fields.due.as_deref(), Some("2024-01-15"));
    }
}
