//! Fallback-chain readers for raw store documents.
//!
//! The backend imposes no schema: a persisted document may be missing newer
//! fields or still carry deprecated ones from before a rename. Every entity
//! mapper is built from these helpers, so a missing field means "apply the
//! default", never an error, and a field rename is absorbed here instead of
//! at call sites. Fallback chains resolve in fixed priority order: the new
//! field name wins when present and non-empty, else the legacy name, else
//! the hardcoded default.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// A raw persisted document as returned by the store.
pub type RawDocument = Map<String, Value>;

fn non_empty_str<'a>(doc: &'a RawDocument, name: &str) -> Option<&'a str> {
    doc.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Returns the first non-empty string among `names`, else `default`.
pub fn str_field(doc: &RawDocument, names: &[&str], default: &str) -> String {
    names
        .iter()
        .find_map(|name| non_empty_str(doc, name))
        .unwrap_or(default)
        .to_string()
}

/// Returns the first non-empty string among `names`, if any.
pub fn opt_str_field(doc: &RawDocument, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| non_empty_str(doc, name))
        .map(str::to_string)
}

/// Reads a boolean field, defaulting when absent or mistyped.
pub fn bool_field(doc: &RawDocument, name: &str, default: bool) -> bool {
    doc.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Reads a numeric field as `f64`, defaulting when absent or mistyped.
pub fn f64_field(doc: &RawDocument, name: &str, default: f64) -> f64 {
    doc.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Reads an optional numeric field as `f64`.
pub fn opt_f64_field(doc: &RawDocument, name: &str) -> Option<f64> {
    doc.get(name).and_then(Value::as_f64)
}

/// Reads a numeric field as `u32`, defaulting when absent or mistyped.
pub fn u32_field(doc: &RawDocument, name: &str, default: u32) -> u32 {
    doc.get(name)
        .and_then(Value::as_u64)
        .map(|n| n.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(default)
}

/// Reads a numeric field as `i64`, defaulting when absent or mistyped.
pub fn i64_field(doc: &RawDocument, name: &str, default: i64) -> i64 {
    doc.get(name).and_then(Value::as_i64).unwrap_or(default)
}

/// Reads an array of strings; non-string elements are dropped.
pub fn str_vec_field(doc: &RawDocument, name: &str) -> Vec<String> {
    doc.get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reads a timestamp from the first parsable field among `names`.
///
/// Accepts an RFC 3339 string or an epoch-milliseconds number; both shapes
/// exist in older documents.
pub fn datetime_field(doc: &RawDocument, names: &[&str]) -> Option<DateTime<Utc>> {
    names.iter().find_map(|name| parse_datetime(doc.get(*name)?))
}

fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(entries: &[(&str, Value)]) -> RawDocument {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_str_field_prefers_new_name() {
        let d = doc(&[("hostId", json!("u-1")), ("host", json!("legacy"))]);
        assert_eq!(str_field(&d, &["hostId", "host"], ""), "u-1");
    }

    #[test]
    fn test_str_field_falls_back_to_legacy_name() {
        let d = doc(&[("host", json!("legacy"))]);
        assert_eq!(str_field(&d, &["hostId", "host"], ""), "legacy");
    }

    #[test]
    fn test_str_field_skips_empty_new_name() {
        let d = doc(&[("hostId", json!("")), ("host", json!("legacy"))]);
        assert_eq!(str_field(&d, &["hostId", "host"], ""), "legacy");
    }

    #[test]
    fn test_str_field_default_when_absent() {
        let d = doc(&[]);
        assert_eq!(str_field(&d, &["hostId", "host"], "anonymous"), "anonymous");
    }

    #[test]
    fn test_numeric_and_bool_defaults() {
        let d = doc(&[("price", json!("not a number"))]);
        assert_eq!(f64_field(&d, "price", 0.0), 0.0);
        assert_eq!(u32_field(&d, "reviewCount", 0), 0);
        assert!(bool_field(&d, "isPublic", true));
    }

    #[test]
    fn test_str_vec_drops_non_strings() {
        let d = doc(&[("tags", json!(["music", 7, "food"]))]);
        assert_eq!(str_vec_field(&d, "tags"), vec!["music", "food"]);
    }

    #[test]
    fn test_datetime_accepts_rfc3339_and_millis() {
        let d = doc(&[
            ("date", json!("2026-08-01T18:00:00Z")),
            ("createdAt", json!(1_750_000_000_000_i64)),
        ]);
        let date = datetime_field(&d, &["date"]).unwrap();
        assert_eq!(date.timestamp(), 1_785_607_200);
        assert!(datetime_field(&d, &["createdAt"]).is_some());
        assert!(datetime_field(&d, &["missing"]).is_none());
    }
}
