//! Export/import document format
//!
//! ```json
//! {
//!   "items": [...],
//!   "settings": {...},
//!   "exportedAt": "2026-01-01T00:00:00Z",
//!   "formatVersion": "1.0"
//! }
//! ```
//!
//! Only `items` is required on import. Backups written by the browser
//! extension used `clips`/`links`, `exportDate` and `version`; those names
//! are accepted too.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StoreError;

/// Version tag written into every export
pub const FORMAT_VERSION: &str = "1.0";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a, E> {
    items: &'a [E],
    settings: &'a Map<String, Value>,
    exported_at: String,
    format_version: &'static str,
}

/// A decoded import document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<E> {
    #[serde(alias = "clips", alias = "links")]
    pub items: Vec<E>,

    #[serde(default)]
    pub settings: Option<Map<String, Value>>,

    #[serde(default, alias = "exportDate")]
    pub exported_at: Option<String>,

    #[serde(default, alias = "version")]
    pub format_version: Option<String>,
}

/// Serialize `items` and `settings` into pretty-printed export text
pub fn encode<E: Serialize>(items: &[E], settings: &Map<String, Value>) -> Result<String, StoreError> {
    let document = ExportDocument {
        items,
        settings,
        exported_at: chrono::Utc::now().to_rfc3339(),
        format_version: FORMAT_VERSION,
    };
    serde_json::to_string_pretty(&document).map_err(StoreError::Serialization)
}

/// Parse export text; any structural problem is a [`StoreError::MalformedImport`]
pub fn decode<E: DeserializeOwned>(text: &str) -> Result<Snapshot<E>, StoreError> {
    serde_json::from_str(text).map_err(|e| StoreError::MalformedImport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_has_metadata() {
        let mut settings = Map::new();
        settings.insert("maxItems".to_string(), json!(50));

        let text = encode(&[json!({"id": "a"})], &settings).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["items"], json!([{"id": "a"}]));
        assert_eq!(value["settings"]["maxItems"], json!(50));
        assert_eq!(value["formatVersion"], json!("1.0"));
        assert!(value["exportedAt"].is_string());
    }

    #[test]
    fn test_decode_requires_items() {
        let result = decode::<Value>(r#"{"settings": {}}"#);
        assert!(matches!(result, Err(StoreError::MalformedImport(_))));
    }

    #[test]
    fn test_decode_rejects_non_sequence_items() {
        let result = decode::<Value>(r#"{"items": {"id": "a"}}"#);
        assert!(matches!(result, Err(StoreError::MalformedImport(_))));

        let result = decode::<Value>("not json at all");
        assert!(matches!(result, Err(StoreError::MalformedImport(_))));
    }

    #[test]
    fn test_decode_legacy_field_names() {
        let snapshot = decode::<Value>(
            r#"{"clips": [1, 2], "exportDate": "2024-05-01T10:00:00.000Z", "version": "1.0"}"#,
        )
        .unwrap();

        assert_eq!(snapshot.items, vec![json!(1), json!(2)]);
        assert_eq!(snapshot.format_version.as_deref(), Some("1.0"));
        assert!(snapshot.settings.is_none());
    }
}
