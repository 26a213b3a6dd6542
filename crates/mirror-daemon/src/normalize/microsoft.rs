//! Microsoft Graph To-Do payload normalization.

use super::{parse_timestamp, string_field};
use mirror_core::{ItemStatus, SourceItem};
use serde_json::Value;

/// Normalize a Graph `todoTask` collection response (`{"value": [...]}`).
pub fn parse_items(payload: &Value, list_id: &str) -> Vec<SourceItem> {
    let items = payload
        .get("value")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    items.iter().filter_map(|raw| parse_item(raw, list_id)).collect()
}

fn parse_item(raw: &Value, list_id: &str) -> Option<SourceItem> {
    let id = string_field(raw, &["id"])?;
    let title = string_field(raw, &["title"])?;

    let status = match raw.get("status").and_then(Value::as_str) {
        Some("completed") => ItemStatus::Completed,
        _ => ItemStatus::Open,
    };

    let notes = raw
        .get("body")
        .and_then(|body| string_field(body, &["content"]))
        .map(String::from);

    let due = raw
        .get("dueDateTime")
        .and_then(|due| string_field(due, &["dateTime"]))
        .map(String::from);

    Some(SourceItem {
        id: id.to_string(),
        list_id: list_id.to_string(),
        parent_id: None,
        title: title.to_string(),
        notes,
        status,
        due,
        modified_at: string_field(raw, &["lastModifiedDateTime"]).and_then(parse_timestamp),
        assigned_to: parse_assignee(raw),
    })
}

// Shared lists expose the assignee either as a plain string or as an
// object with a display name.
fn parse_assignee(raw: &Value) -> Option<String> {
    match raw.get("assignedTo") {
        Some(Value::String(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
        Some(obj @ Value::Object(_)) => {
            string_field(obj, &["displayName", "name"]).map(String::from)
        }
        _ => None,
    }
}
