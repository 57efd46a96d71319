//! Write-payload sanitizer.
//!
//! Every document write funnels through [`sanitize`] before it reaches the
//! store. Required fields are checked first, null-valued fields are stripped
//! (the persistence layer rejects undefined values; omission is the portable
//! equivalent), and the serialized size is bounded below the backend's
//! per-document limit so an oversized payload fails locally with a useful
//! message instead of a wasted round trip.

use serde_json::{Map, Value};
use thiserror::Error;

/// A draft write payload, keyed by wire field name.
pub type Document = Map<String, Value>;

/// Serialized-size ceiling for a single document, safely under the backend's
/// hard per-document limit. Image-heavy payloads are the common way to hit it.
pub const MAX_DOCUMENT_BYTES: usize = 900 * 1024;

/// Reasons a write payload is rejected before any network call.
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// A field declared required is absent, null, or an empty string.
    #[error("required field missing: {field}")]
    MissingField { field: String },

    /// The serialized payload exceeds the document size ceiling.
    #[error("document too large: {size} bytes exceeds limit of {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Sanitizes a draft payload with the default size ceiling.
pub fn sanitize(payload: Document, required: &[&str]) -> Result<Document, SanitizeError> {
    sanitize_with_limit(payload, required, MAX_DOCUMENT_BYTES)
}

/// Sanitizes a draft payload against an explicit size ceiling.
///
/// Fails before any store call: required fields are verified, null-valued
/// fields are stripped, and the remaining payload must serialize under
/// `limit` bytes.
pub fn sanitize_with_limit(
    mut payload: Document,
    required: &[&str],
    limit: usize,
) -> Result<Document, SanitizeError> {
    for field in required {
        if !is_present(payload.get(*field)) {
            return Err(SanitizeError::MissingField {
                field: (*field).to_string(),
            });
        }
    }

    payload.retain(|_, value| !value.is_null());

    let size = serde_json::to_vec(&payload).map(|bytes| bytes.len()).unwrap_or(0);
    if size > limit {
        return Err(SanitizeError::DocumentTooLarge { size, limit });
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(entries: &[(&str, Value)]) -> Document {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let doc = payload(&[("city", json!("Lisbon"))]);
        let err = sanitize(doc, &["title", "city"]).unwrap_err();
        assert!(matches!(err, SanitizeError::MissingField { field } if field == "title"));
    }

    #[test]
    fn test_null_required_field_is_rejected() {
        let doc = payload(&[("title", Value::Null)]);
        assert!(sanitize(doc, &["title"]).is_err());
    }

    #[test]
    fn test_empty_string_required_field_is_rejected() {
        let doc = payload(&[("title", json!(""))]);
        assert!(sanitize(doc, &["title"]).is_err());
    }

    #[test]
    fn test_null_fields_are_stripped() {
        let doc = payload(&[
            ("title", json!("Vinyl night")),
            ("address", Value::Null),
            ("price", json!(0)),
        ]);
        let sanitized = sanitize(doc, &["title"]).unwrap();
        assert!(!sanitized.contains_key("address"));
        assert!(sanitized.contains_key("price"));
    }

    #[test]
    fn test_oversized_payload_is_rejected_with_size() {
        let doc = payload(&[
            ("title", json!("Gallery opening")),
            ("images", json!("x".repeat(4096))),
        ]);
        let err = sanitize_with_limit(doc, &["title"], 1024).unwrap_err();
        match err {
            SanitizeError::DocumentTooLarge { size, limit } => {
                assert!(size > limit);
                assert_eq!(limit, 1024);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_payload_passes_through() {
        let doc = payload(&[("title", json!("Food market")), ("city", json!("Porto"))]);
        let sanitized = sanitize(doc.clone(), &["title", "city"]).unwrap();
        assert_eq!(sanitized, doc);
    }
}
