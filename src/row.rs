//! Row access
//!
//! The evaluator never owns attribute storage; it pulls values through
//! the [`RowAccessor`] capability the host injects per evaluation call.
//! Impls are provided for plain hash maps and for `serde_json` objects
//! so JSON-backed attribute tables work out of the box.

use crate::value::FieldValue;
use std::collections::HashMap;

/// Capability exposing one row of the external attribute store.
///
/// `get` is called once per field reference per evaluation pass;
/// returning `None` (or [`FieldValue::Null`]) means the row has no
/// value for that field.
pub trait RowAccessor {
    fn get(&self, field_name: &str) -> Option<FieldValue>;
}

/// A row with no attributes. Useful for expressions made only of
/// literals, and as the degenerate row in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRow;

impl RowAccessor for EmptyRow {
    fn get(&self, _field_name: &str) -> Option<FieldValue> {
        None
    }
}

impl RowAccessor for HashMap<String, FieldValue> {
    fn get(&self, field_name: &str) -> Option<FieldValue> {
        if let Some(v) = HashMap::get(self, field_name) {
            return Some(v.clone());
        }
        // Field names are case-insensitive in the catalog; fall back to
        // a scan when the exact spelling is absent.
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(field_name))
            .map(|(_, v)| v.clone())
    }
}

impl RowAccessor for serde_json::Map<String, serde_json::Value> {
    fn get(&self, field_name: &str) -> Option<FieldValue> {
        let value = serde_json::Map::get(self, field_name).or_else(|| {
            self.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(field_name))
                .map(|(_, v)| v)
        })?;
        Some(json_to_field_value(value))
    }
}

fn json_to_field_value(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::Null => FieldValue::Null,
        serde_json::Value::Bool(b) => FieldValue::Boolean(*b),
        serde_json::Value::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => FieldValue::Text(s.clone()),
        // Structured attribute values only make sense as display text.
        other => FieldValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hashmap_row_is_case_insensitive() {
        let mut row = HashMap::new();
        row.insert("NAME".to_string(), FieldValue::from("Paris"));
        assert_eq!(
            RowAccessor::get(&row, "name"),
            Some(FieldValue::Text("Paris".to_string()))
        );
    }

    #[test]
    fn test_json_row_conversions() {
        let serde_json::Value::Object(row) = json!({
            "name": "Oslo",
            "pop": 709000,
            "capital": true,
            "notes": null,
        }) else {
            unreachable!()
        };

        assert_eq!(
            RowAccessor::get(&row, "name"),
            Some(FieldValue::Text("Oslo".to_string()))
        );
        assert_eq!(
            RowAccessor::get(&row, "POP"),
            Some(FieldValue::Number(709000.0))
        );
        assert_eq!(
            RowAccessor::get(&row, "capital"),
            Some(FieldValue::Boolean(true))
        );
        assert_eq!(RowAccessor::get(&row, "notes"), Some(FieldValue::Null));
        assert_eq!(RowAccessor::get(&row, "missing"), None);
    }
}
