//! Platform payload normalization.
//!
//! Each platform's REST responses come in more than one observed shape;
//! these adapters inspect them defensively and produce the canonical
//! `SourceItem` the reconciliation core works with. Items missing the
//! fields we cannot sync without (an ID and a title) are skipped, not
//! errors: a malformed entry must never abort a whole fetch.

pub mod alexa;
pub mod google;
pub mod microsoft;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Parse an RFC 3339 timestamp, tolerating a missing offset.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Graph-style "2024-01-15T09:30:00.0000000" without an offset; treat as UTC.
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a millisecond epoch timestamp from either a number or a string.
pub(crate) fn parse_epoch_ms(value: &Value) -> Option<DateTime<Utc>> {
    let ms = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(ms)
}

/// Non-empty string field lookup across several candidate keys.
pub(crate) fn string_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_shapes() {
        assert!(parse_timestamp("2024-01-15T09:30:00Z").is_some());
        assert!(parse_timestamp("2024-01-15T09:30:00+02:00").is_some());
        assert!(parse_timestamp("2024-01-15T09:30:00.0000000").is_some());
        assert!(parse_timestamp("not a time").is_none());
    }

    #[test]
    fn test_parse_epoch_ms_shapes() {
        assert!(parse_epoch_ms(&json!(1705311000000i64)).is_some());
        assert!(parse_epoch_ms(&json!("1705311000000")).is_some());
        assert!(parse_epoch_ms(&json!({"ms": 1})).is_none());
    }

    #[test]
    fn test_string_field_skips_blank_candidates() {
        let value = json!({"label": "  ", "text": "Buy milk"});
        assert_eq!(string_field(&value, &["label", "text"]), Some("Buy milk"));
        assert_eq!(string_field(&value, &["missing"]), None);
    }
}
