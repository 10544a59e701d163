use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::error::{DiffError, Result, Side, Warning, WarningKind};

/// One input object: field name to arbitrary JSON value.
pub type Record = Map<String, Value>;

/// Human-readable JSON type of a value, used in error and warning messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Sorted, comma-joined field names of a record.
pub fn signature_of(record: &Record) -> String {
    let mut fields: Vec<&str> = record.keys().map(String::as_str).collect();
    fields.sort_unstable();
    fields.join(",")
}

/// Returns the value of `field` if it is a string that is non-empty after trimming.
pub fn usable_key<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    match record.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Structural equality: object fields compare regardless of order, arrays
/// element-wise in order, numbers by numeric value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => records_equal(x, y),
        _ => false,
    }
}

pub fn records_equal(a: &Record, b: &Record) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    // Exact comparison first so large integers don't collapse through f64.
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
        _ => false,
    }
}

/// Serializes a value with object fields sorted, whatever the map's own order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 of the canonical serialization, hex encoded.
pub fn fingerprint(record: &Record) -> String {
    let mut entries: Vec<(&String, &Value)> = record.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut hasher = Sha256::new();
    hasher.update(b"{");
    for (i, (k, v)) in entries.into_iter().enumerate() {
        if i > 0 {
            hasher.update(b",");
        }
        hasher.update(Value::String(k.clone()).to_string().as_bytes());
        hasher.update(b":");
        hasher.update(canonical_json(v).as_bytes());
    }
    hasher.update(b"}");
    hex::encode(hasher.finalize())
}

/// Requires `records` to be an array of objects. The first non-object
/// element fails the whole collection.
pub fn strict_records(records: &Value, side: Option<Side>) -> Result<Vec<&Record>> {
    let items = as_array(records, side)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object().ok_or(DiffError::InvalidInputShape {
                side,
                index: Some(index),
                found: json_type_name(item),
            })
        })
        .collect()
}

/// Like [`strict_records`] but non-object elements are skipped with an
/// `InvalidRecord` warning. Only a non-array input is fatal.
pub fn lenient_records<'a>(
    records: &'a Value,
    side: Side,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<(usize, &'a Record)>> {
    let items = as_array(records, Some(side))?;
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item.as_object() {
            Some(record) => out.push((index, record)),
            None => warnings.push(
                Warning::new(
                    WarningKind::InvalidRecord,
                    format!(
                        "{side} element {index} is {}, expected an object; skipped",
                        json_type_name(item)
                    ),
                )
                .at(side, index),
            ),
        }
    }
    Ok(out)
}

fn as_array(records: &Value, side: Option<Side>) -> Result<&Vec<Value>> {
    records.as_array().ok_or(DiffError::InvalidInputShape {
        side,
        index: None,
        found: json_type_name(records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn signature_is_sorted_and_comma_joined() {
        assert_eq!(signature_of(&obj(json!({"name": 1, "id": 2, "age": 3}))), "age,id,name");
        assert_eq!(signature_of(&Record::new()), "");
    }

    #[test]
    fn usable_key_requires_non_blank_string() {
        let r = obj(json!({"a": "x", "b": "   ", "c": 5, "d": null}));
        assert_eq!(usable_key(&r, "a"), Some("x"));
        assert_eq!(usable_key(&r, "b"), None);
        assert_eq!(usable_key(&r, "c"), None);
        assert_eq!(usable_key(&r, "d"), None);
        assert_eq!(usable_key(&r, "missing"), None);
    }

    #[test]
    fn object_equality_ignores_field_order() {
        let a: Value = serde_json::from_str(r#"{"a":1,"b":{"x":[1,2],"y":null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b":{"y":null,"x":[1,2]},"a":1}"#).unwrap();
        assert!(values_equal(&a, &b));
    }

    #[test]
    fn array_equality_is_order_sensitive() {
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!([1]), &json!([1, 1])));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!(0), &json!(-0.0)));
        assert!(values_equal(&json!(-0.0), &json!(0.0)));
        assert!(!values_equal(&json!(1), &json!(2)));
        assert!(!values_equal(&json!(u64::MAX), &json!(u64::MAX - 1)));
    }

    #[test]
    fn no_type_coercion() {
        assert!(!values_equal(&json!("1"), &json!(1)));
        assert!(!values_equal(&json!(null), &json!(false)));
        assert!(!values_equal(&json!(0), &json!(false)));
    }

    #[test]
    fn canonical_json_sorts_fields() {
        let v: Value = serde_json::from_str(r#"{"b":[{"z":1,"a":2}],"a":"x"}"#).unwrap();
        assert_eq!(canonical_json(&v), r#"{"a":"x","b":[{"a":2,"z":1}]}"#);
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a: Value = serde_json::from_str(r#"{"x":1,"y":"2"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y":"2","x":1}"#).unwrap();
        let fa = fingerprint(a.as_object().unwrap());
        assert_eq!(fa, fingerprint(b.as_object().unwrap()));
        assert_eq!(fa.len(), 64);
        assert_ne!(fa, fingerprint(&obj(json!({"x": 2, "y": "2"}))));
    }

    #[test]
    fn strict_records_rejects_non_objects() {
        let err = strict_records(&json!([{"a": 1}, null]), None).unwrap_err();
        assert_eq!(
            err,
            DiffError::InvalidInputShape { side: None, index: Some(1), found: "null" }
        );
        let err = strict_records(&json!({"a": 1}), Some(Side::Before)).unwrap_err();
        assert!(matches!(err, DiffError::InvalidInputShape { index: None, .. }));
    }

    #[test]
    fn lenient_records_skips_with_warning() {
        let input = json!([{"a": 1}, 5, {"b": 2}]);
        let mut warnings = Vec::new();
        let records = lenient_records(&input, Side::After, &mut warnings).unwrap();
        assert_eq!(records.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::InvalidRecord);
        assert_eq!(warnings[0].index, Some(1));
    }
}
