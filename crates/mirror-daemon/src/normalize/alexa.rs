//! Alexa reminders and shopping-list payload normalization.
//!
//! Neither endpoint exposes a reliable modification stamp in every
//! deployment: reminders carry an `updatedDate` epoch only sometimes, and
//! shopping items usually carry nothing usable. Items without a parseable
//! stamp fall back to content-hash change detection in the core.

use super::{parse_epoch_ms, parse_timestamp, string_field};
use mirror_core::{ItemStatus, SourceItem};
use serde_json::Value;

/// Normalize a reminders response, either `{"alerts": [...]}` or a bare array.
pub fn parse_reminders(payload: &Value, list_id: &str) -> Vec<SourceItem> {
    entries(payload, "alerts")
        .iter()
        .filter_map(|raw| parse_reminder(raw, list_id))
        .collect()
}

fn parse_reminder(raw: &Value, list_id: &str) -> Option<SourceItem> {
    let id = string_field(raw, &["alertToken", "id"])?;
    let title = string_field(raw, &["reminderLabel", "label"])?;

    let status = match string_field(raw, &["status"]) {
        Some("COMPLETED") | Some("completed") => ItemStatus::Completed,
        _ => ItemStatus::Open,
    };

    let modified_at = raw
        .get("updatedDate")
        .and_then(parse_epoch_ms)
        .or_else(|| string_field(raw, &["updatedTime"]).and_then(parse_timestamp));

    Some(SourceItem {
        id: id.to_string(),
        list_id: list_id.to_string(),
        parent_id: None,
        title: title.to_string(),
        notes: None,
        status,
        due: string_field(raw, &["scheduledTime", "alarmTime"]).map(String::from),
        modified_at,
        assigned_to: None,
    })
}

/// Normalize a shopping-list response, either `{"listItems": [...]}` or
/// `{"items": [...]}`.
pub fn parse_shopping_items(payload: &Value, list_id: &str) -> Vec<SourceItem> {
    let raw_items = match payload.get("listItems").and_then(Value::as_array) {
        Some(items) => items.as_slice(),
        None => entries(payload, "items"),
    };
    raw_items
        .iter()
        .filter_map(|raw| parse_shopping_item(raw, list_id))
        .collect()
}

fn parse_shopping_item(raw: &Value, list_id: &str) -> Option<SourceItem> {
    let id = string_field(raw, &["id", "itemId"])?;
    let title = string_field(raw, &["value", "text"])?;

    let completed = raw.get("completed").and_then(Value::as_bool).unwrap_or(false);

    Some(SourceItem {
        id: id.to_string(),
        list_id: list_id.to_string(),
        parent_id: None,
        title: title.to_string(),
        notes: None,
        status: ItemStatus::from_completed(completed),
        due: None,
        modified_at: string_field(raw, &["updatedDateTime"]).and_then(parse_timestamp),
        assigned_to: None,
    })
}

fn entries<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .or_else(|| payload.as_array().map(Vec::as_slice))
        .unwrap_or_default()
}
