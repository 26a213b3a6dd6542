//! Google Tasks payload normalization.
//!
//! Tasks API list responses carry `{"items": [...]}`; each task has a
//! stable `id`, `status` of `needsAction`/`completed`, an RFC 3339
//! `updated` stamp, a date-valued `due`, and an optional `parent` for
//! one level of subtasks.

use super::{parse_timestamp, string_field};
use mirror_core::{ItemStatus, SourceItem};
use serde_json::Value;

/// Normalize one tasklist response.
pub fn parse_items(payload: &Value, list_id: &str) -> Vec<SourceItem> {
    let items = payload
        .get("items")
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

    Some(SourceItem {
        id: id.to_string(),
        list_id: list_id.to_string(),
        parent_id: string_field(raw, &["parent"]).map(String::from),
        title: title.to_string(),
        notes: string_field(raw, &["notes"]).map(String::from),
        status,
        due: string_field(raw, &["due"]).map(String::from),
        modified_at: string_field(raw, &["updated"]).and_then(parse_timestamp),
        assigned_to: None,
    })
}
