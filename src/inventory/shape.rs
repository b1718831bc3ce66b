//! Response shape normalization
//!
//! The legacy generation wraps payloads as `{"value": ...}`; the current one
//! returns bare arrays and objects. Everything is normalized here so the
//! pipeline never looks at envelopes.

use serde_json::{Map, Value};

/// Normalize a payload into an ordered list of records
///
/// - `{"value": [...]}` -> the wrapped array
/// - `[...]` -> unchanged
/// - any other object -> its values, in document order (keyed-map shape)
/// - anything else -> empty
pub fn to_list(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Object(map) => match map.get("value") {
            Some(Value::Array(items)) => items.clone(),
            _ => map.values().cloned().collect(),
        },
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

/// Normalize a payload into a single record
///
/// - `{"value": {...}}` -> the wrapped object
/// - any other object -> itself
/// - anything else -> empty record
pub fn to_record(payload: &Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => match map.get("value") {
            Some(Value::Object(inner)) => inner.clone(),
            _ => map.clone(),
        },
        _ => Map::new(),
    }
}

/// First alias present with a usable value; numbers are stringified
pub fn first_present(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match record.get(*alias)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_list_shapes() {
        assert_eq!(to_list(&json!({"value": [1, 2, 3]})), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(to_list(&json!([1, 2, 3])), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(to_list(&json!({"a": 1, "b": 2})), vec![json!(1), json!(2)]);
        assert_eq!(to_list(&json!(42)), Vec::<Value>::new());
        assert_eq!(to_list(&json!("text")), Vec::<Value>::new());
        assert_eq!(to_list(&Value::Null), Vec::<Value>::new());
    }

    #[test]
    fn test_to_list_keyed_map_keeps_document_order() {
        let payload: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        assert_eq!(to_list(&payload), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_to_list_non_array_value_is_keyed_map() {
        // A `value` that is not a list is just another key
        assert_eq!(to_list(&json!({"value": {"x": 1}})), vec![json!({"x": 1})]);
    }

    #[test]
    fn test_to_record_shapes() {
        let expected = json!({"x": 1});
        assert_eq!(Value::Object(to_record(&json!({"value": {"x": 1}}))), expected);
        assert_eq!(Value::Object(to_record(&json!({"x": 1}))), expected);
        assert!(to_record(&json!([1, 2])).is_empty());
        assert!(to_record(&json!("x")).is_empty());
    }

    #[test]
    fn test_to_record_scalar_value_stays_wrapped() {
        let record = to_record(&json!({"value": "tok"}));
        assert_eq!(record.get("value"), Some(&json!("tok")));
    }

    #[test]
    fn test_first_present() {
        let record = to_record(&json!({"vm_id": "vm-2", "id": "ignored", "name": "", "vm_name": "web"}));
        assert_eq!(first_present(&record, &["vm", "vm_id", "id"]), Some("vm-2".to_string()));
        assert_eq!(first_present(&record, &["name", "vm_name"]), Some("web".to_string()));
        assert_eq!(first_present(&record, &["missing"]), None);

        let numeric = to_record(&json!({"pci_slot_number": 160}));
        assert_eq!(first_present(&numeric, &["nic", "pci_slot_number"]), Some("160".to_string()));
    }
}
