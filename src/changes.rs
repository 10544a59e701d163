use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::record::{values_equal, Record};

/// A field whose value differs between the two sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub before: Value,
    pub after: Value,
}

/// Field-level breakdown between two records of the same entity.
/// A field name appears in at most one of the three maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    pub added: BTreeMap<String, Value>,
    pub removed: BTreeMap<String, Value>,
    pub changed: BTreeMap<String, ValueChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Number of fields touched.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }

    /// Rebuilds the after record from the before record.
    pub fn apply(&self, before: &Record) -> Record {
        let mut out = before.clone();
        for field in self.removed.keys() {
            out.remove(field);
        }
        for (field, change) in &self.changed {
            out.insert(field.clone(), change.after.clone());
        }
        for (field, value) in &self.added {
            out.insert(field.clone(), value.clone());
        }
        out
    }
}

/// Compares two records field by field using structural equality.
pub fn compute_changes(before: &Record, after: &Record) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (field, old) in before {
        match after.get(field) {
            None => {
                changes.removed.insert(field.clone(), old.clone());
            }
            Some(new) if !values_equal(old, new) => {
                changes.changed.insert(
                    field.clone(),
                    ValueChange {
                        before: old.clone(),
                        after: new.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }
    for (field, new) in after {
        if !before.contains_key(field) {
            changes.added.insert(field.clone(), new.clone());
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn classifies_added_removed_changed() {
        let before = obj(json!({"id": "1", "name": "Alice", "tmp": true, "same": [1, 2]}));
        let after = obj(json!({"id": "1", "name": "Alicia", "age": 30, "same": [1, 2]}));
        let changes = compute_changes(&before, &after);

        assert_eq!(changes.added, BTreeMap::from([("age".to_string(), json!(30))]));
        assert_eq!(changes.removed, BTreeMap::from([("tmp".to_string(), json!(true))]));
        assert_eq!(
            changes.changed,
            BTreeMap::from([(
                "name".to_string(),
                ValueChange { before: json!("Alice"), after: json!("Alicia") }
            )])
        );
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn identical_records_have_no_changes() {
        let r = obj(json!({"a": {"b": [1, {"c": null}]}}));
        assert!(compute_changes(&r, &r.clone()).is_empty());
    }

    #[test]
    fn nested_difference_is_reported_on_top_level_field() {
        let before = obj(json!({"meta": {"tags": ["a", "b"]}}));
        let after = obj(json!({"meta": {"tags": ["b", "a"]}}));
        let changes = compute_changes(&before, &after);
        assert!(changes.changed.contains_key("meta"));
    }

    #[test]
    fn numeric_representation_is_not_a_change() {
        let before = obj(json!({"n": 1, "z": 0}));
        let after = obj(json!({"n": 1.0, "z": -0.0}));
        assert!(compute_changes(&before, &after).is_empty());
    }

    #[test]
    fn null_is_a_value_not_an_absence() {
        let before = obj(json!({"a": null}));
        let after = obj(json!({}));
        let changes = compute_changes(&before, &after);
        assert_eq!(changes.removed.get("a"), Some(&Value::Null));
    }

    #[test]
    fn apply_reconstructs_after() {
        let before = obj(json!({"id": "1", "x": 1, "gone": "y"}));
        let after = obj(json!({"id": "1", "x": 2, "new": [true]}));
        let changes = compute_changes(&before, &after);
        assert_eq!(changes.apply(&before), after);
    }
}
